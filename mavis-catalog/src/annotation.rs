//! Micro-architectural annotation catalogs (`uArchInfo` collaborator):
//! mnemonic → `UArchInfo`, merged from auxiliary JSON files.
//!
//! Grounded on `AnnotationRegistry.hpp`'s merge semantics: a mnemonic
//! repeated within one file is `AnnotationNotUniqueInFile`; a mnemonic
//! repeated across files is a permitted override, merged field-by-field —
//! only the keys present in the later file's object are overwritten, the
//! rest keep whatever the earlier file set.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{CatalogError, Result};
use crate::json::as_string;

/// Execution unit an instruction issues to. A closed set, name<->value
/// looked up from a static table (design note §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Alu,
    Mul,
    Div,
    Load,
    Store,
    Branch,
    Fpu,
    Vector,
    Csr,
}

const UNITS: &[(&str, Unit)] = &[
    ("alu", Unit::Alu),
    ("mul", Unit::Mul),
    ("div", Unit::Div),
    ("load", Unit::Load),
    ("store", Unit::Store),
    ("branch", Unit::Branch),
    ("fpu", Unit::Fpu),
    ("vector", Unit::Vector),
    ("csr", Unit::Csr),
];

impl Unit {
    fn from_key(key: &str) -> Option<Unit> {
        UNITS.iter().find(|(name, _)| *name == key).map(|(_, u)| *u)
    }

    pub fn name(self) -> &'static str {
        UNITS.iter().find(|(_, u)| *u == self).map(|(n, _)| *n).unwrap()
    }
}

/// Pipeline stage an instruction is issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueTarget {
    Int,
    Float,
    Vector,
    LoadStore,
}

const ISSUE_TARGETS: &[(&str, IssueTarget)] = &[
    ("int", IssueTarget::Int),
    ("float", IssueTarget::Float),
    ("vector", IssueTarget::Vector),
    ("load_store", IssueTarget::LoadStore),
];

impl IssueTarget {
    fn from_key(key: &str) -> Option<IssueTarget> {
        ISSUE_TARGETS.iter().find(|(name, _)| *name == key).map(|(_, t)| *t)
    }

    pub fn name(self) -> &'static str {
        ISSUE_TARGETS
            .iter()
            .find(|(_, t)| *t == self)
            .map(|(n, _)| n)
            .unwrap()
    }
}

/// Per-mnemonic micro-architectural attributes (issue target, execution
/// unit, latency, pipelining/serialization flags, reorder-buffer group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UArchInfo {
    pub unit: Unit,
    pub issue: IssueTarget,
    pub latency: u32,
    pub pipelined: bool,
    pub serialize: bool,
    pub rob_group: Option<i64>,
}

/// Parses one annotation object, falling back to `base`'s fields (an
/// earlier file's entry for the same mnemonic) for any key the object
/// doesn't mention, and to the hardcoded defaults when there is no
/// `base` either. Mirrors `AnnotationRegistry.hpp`'s `parse_`, which only
/// touches the fields present in the JSON object it's given.
fn parse_uarch_info(mnemonic: &str, obj: &Value, base: Option<&UArchInfo>) -> Result<UArchInfo> {
    let unit = match as_string(obj, "unit") {
        Some(s) => Unit::from_key(&s).ok_or_else(|| CatalogError::UArchInfoUnknownUnit {
            mnemonic: mnemonic.to_string(),
            value: s,
        })?,
        None => base.map(|b| b.unit).unwrap_or(Unit::Alu),
    };
    let issue = match as_string(obj, "issue") {
        Some(s) => IssueTarget::from_key(&s).ok_or_else(|| CatalogError::UArchInfoUnknownIssueTarget {
            mnemonic: mnemonic.to_string(),
            value: s,
        })?,
        None => base.map(|b| b.issue).unwrap_or(IssueTarget::Int),
    };
    let latency = match obj.get("latency").and_then(Value::as_u64) {
        Some(v) => v as u32,
        None => base.map(|b| b.latency).unwrap_or(1),
    };
    let pipelined = match obj.get("pipelined").and_then(Value::as_bool) {
        Some(v) => v,
        None => base.map(|b| b.pipelined).unwrap_or(true),
    };
    let serialize = match obj.get("serialize").and_then(Value::as_bool) {
        Some(v) => v,
        None => base.map(|b| b.serialize).unwrap_or(false),
    };
    let rob_group = match obj.get("rob_group") {
        None => base.and_then(|b| b.rob_group),
        Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_i64().ok_or_else(|| CatalogError::UArchInfoROBGroupParseError {
            mnemonic: mnemonic.to_string(),
            value: n.to_string(),
        })?),
        Some(Value::String(s)) => Some(s.parse::<i64>().map_err(|_| CatalogError::UArchInfoROBGroupParseError {
            mnemonic: mnemonic.to_string(),
            value: s.clone(),
        })?),
        Some(other) => {
            return Err(CatalogError::UArchInfoROBGroupParseError {
                mnemonic: mnemonic.to_string(),
                value: other.to_string(),
            })
        }
    };
    Ok(UArchInfo {
        unit,
        issue,
        latency,
        pipelined,
        serialize,
        rob_group,
    })
}

#[derive(Default)]
pub struct AnnotationRegistry {
    entries: HashMap<String, Arc<UArchInfo>>,
}

impl AnnotationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one annotation file (a JSON array of `{mnemonic, ...}`
    /// objects) and merges it in. A mnemonic repeated *within* `contents`
    /// is `AnnotationNotUniqueInFile`; a mnemonic that already exists from
    /// an earlier file is updated field-by-field, keeping whatever fields
    /// this file's object leaves unmentioned.
    pub fn load_file(&mut self, path: &str, contents: &str) -> Result<()> {
        let parsed: Value = serde_json::from_str(contents).map_err(|source| CatalogError::BadAnnotationFileJson {
            path: path.to_string(),
            source,
        })?;
        let entries = parsed.as_array().cloned().unwrap_or_default();

        let mut seen_this_file: HashSet<String> = HashSet::new();
        for entry in &entries {
            let mnemonic = as_string(entry, "mnemonic").ok_or_else(|| CatalogError::MissingMnemonic {
                file: path.to_string(),
                stencil: None,
            })?;
            if !seen_this_file.insert(mnemonic.clone()) {
                return Err(CatalogError::AnnotationNotUniqueInFile {
                    mnemonic,
                    file: path.to_string(),
                });
            }
            let info = {
                let base = self.entries.get(&mnemonic).map(Arc::as_ref);
                parse_uarch_info(&mnemonic, entry, base)?
            };
            log::trace!("uArchInfo: {mnemonic}");
            self.entries.insert(mnemonic, Arc::new(info));
        }
        Ok(())
    }

    /// Returns `None` on miss; per spec §9, absence of an annotation is
    /// optional enrichment, never fatal by itself.
    pub fn find(&self, mnemonic: &str) -> Option<Arc<UArchInfo>> {
        self.entries.get(mnemonic).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_within_one_file_is_an_error() {
        let mut reg = AnnotationRegistry::new();
        let contents = r#"[{"mnemonic":"addi","unit":"alu"},{"mnemonic":"addi","unit":"alu"}]"#;
        let err = reg.load_file("a.json", contents).unwrap_err();
        assert!(matches!(err, CatalogError::AnnotationNotUniqueInFile { .. }));
    }

    #[test]
    fn cross_file_repeat_overrides() {
        let mut reg = AnnotationRegistry::new();
        reg.load_file("a.json", r#"[{"mnemonic":"addi","unit":"alu","latency":1}]"#)
            .unwrap();
        reg.load_file("b.json", r#"[{"mnemonic":"addi","unit":"alu","latency":3}]"#)
            .unwrap();
        assert_eq!(reg.find("addi").unwrap().latency, 3);
    }

    #[test]
    fn cross_file_partial_override_keeps_unmentioned_fields() {
        let mut reg = AnnotationRegistry::new();
        reg.load_file(
            "a.json",
            r#"[{"mnemonic":"addi","unit":"mul","latency":5}]"#,
        )
        .unwrap();
        reg.load_file("b.json", r#"[{"mnemonic":"addi","pipelined":false}]"#)
            .unwrap();

        let info = reg.find("addi").unwrap();
        assert_eq!(info.unit, Unit::Mul);
        assert_eq!(info.latency, 5);
        assert!(!info.pipelined);
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let mut reg = AnnotationRegistry::new();
        let err = reg
            .load_file("a.json", r#"[{"mnemonic":"addi","unit":"bogus"}]"#)
            .unwrap_err();
        assert!(matches!(err, CatalogError::UArchInfoUnknownUnit { .. }));
    }

    #[test]
    fn rob_group_parses_string_and_number() {
        let mut reg = AnnotationRegistry::new();
        reg.load_file(
            "a.json",
            r#"[{"mnemonic":"addi","rob_group":"2"},{"mnemonic":"c.add","rob_group":4}]"#,
        )
        .unwrap();
        assert_eq!(reg.find("addi").unwrap().rob_group, Some(2));
        assert_eq!(reg.find("c.add").unwrap().rob_group, Some(4));
    }

    #[test]
    fn missing_annotation_is_none_not_error() {
        let reg = AnnotationRegistry::new();
        assert!(reg.find("addi").is_none());
    }
}
