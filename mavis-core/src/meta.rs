//! Per-instruction static attributes, frozen after `configure`.

use std::collections::{HashMap, HashSet};

use crate::operand::OperandType;

bitflags::bitflags! {
    /// Which base/extension ISA sets an instruction belongs to. A plain
    /// 64-bit bitmask, per the closed-enum design note.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IsaSet: u64 {
        const RV32I = 1 << 0;
        const RV64I = 1 << 1;
        const RVC   = 1 << 2;
        const RVM   = 1 << 3;
        const RVA   = 1 << 4;
        const RVF   = 1 << 5;
        const RVD   = 1 << 6;
        const RVV   = 1 << 7;
    }
}

impl Default for IsaSet {
    fn default() -> Self {
        IsaSet::RV32I
    }
}

/// Per-instruction static attributes. Mutable during build (overrides
/// accumulate on overlay derivation); frozen after `configure` returns.
#[derive(Debug, Clone)]
pub struct InstMetaData {
    pub mnemonic: String,
    pub form: &'static str,
    pub isa: IsaSet,
    pub operand_types: HashMap<String, OperandType>,
    pub tags: HashSet<String>,
    pub fixed: Vec<String>,
    pub ignore: Vec<String>,
    pub sources: Vec<String>,
    pub dests: Vec<String>,
    pub specials: Vec<String>,
    /// Opaque metadata payload from the catalog's `"data"` key, carried
    /// as already-serialized text so this crate never depends on a JSON
    /// library (spec §1: JSON library choice is an external collaborator).
    pub data: Option<String>,
    /// Mnemonic this instruction expands to/from (catalog `"expand"` key),
    /// e.g. a compressed form naming the standard instruction it is
    /// shorthand for. Informational only: the core never acts on it.
    pub expand: Option<String>,
}

impl InstMetaData {
    pub fn new(mnemonic: impl Into<String>, form: &'static str) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            form,
            isa: IsaSet::default(),
            operand_types: HashMap::new(),
            tags: HashSet::new(),
            fixed: Vec::new(),
            ignore: Vec::new(),
            sources: Vec::new(),
            dests: Vec::new(),
            specials: Vec::new(),
            data: None,
            expand: None,
        }
    }

    /// Clone this metadata for an overlay, applying per-field operand-type
    /// overrides. Applying the same override map twice is a no-op: the
    /// clone always starts from `self`, never from a previously-overridden
    /// clone.
    pub fn derive_with_overrides(&self, overrides: &HashMap<String, OperandType>) -> Self {
        let mut cloned = self.clone();
        for (field, ty) in overrides {
            cloned.operand_types.insert(field.clone(), *ty);
        }
        cloned
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_idempotent() {
        let mut base = InstMetaData::new("addi", "I");
        base.operand_types
            .insert("rd".into(), OperandType::Reg(crate::operand::RegFile::Integer));

        let mut overrides = HashMap::new();
        overrides.insert("rd".into(), OperandType::Immediate);

        let once = base.derive_with_overrides(&overrides);
        let twice = once.derive_with_overrides(&overrides);
        assert_eq!(once.operand_types, twice.operand_types);
    }

    #[test]
    fn isa_set_union() {
        let both = IsaSet::RV32I | IsaSet::RVC;
        assert!(both.contains(IsaSet::RV32I));
        assert!(both.contains(IsaSet::RVC));
        assert!(!both.contains(IsaSet::RVM));
    }
}
