//! `DTable`: the trie root, its caches, and the `getInfo`/`makeInst` family
//! of decode entry points.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{MavisError, Result};
use crate::extractor::Extractor;
use crate::factory::{FactoryNode, FixedCase, LeafRef, NodeRef};
use crate::field::{Field, Opcode};
use crate::form::{Form, FormRegistry};
use crate::meta::InstMetaData;
use crate::operand::OperandInfo;
use crate::overlay::{sort_by_specificity, Overlay};

/// Reference ISA family uses a 1023-slot (prime) direct-mapped cache.
pub const DEFAULT_CACHE_SIZE: usize = 1023;

#[derive(Debug)]
struct CacheLine<T> {
    tag: Opcode,
    value: T,
}

/// A fixed-capacity direct-mapped cache. Collisions replace; there is no
/// chaining. Single-threaded by contract (spec §5): callers sharing one
/// `DTable` across threads must synchronize externally or disable caching.
#[derive(Debug)]
struct Cache<T: Clone> {
    size: usize,
    slots: Vec<Option<CacheLine<T>>>,
}

impl<T: Clone> Cache<T> {
    fn new(size: usize) -> Self {
        Self {
            size,
            slots: vec![None; size],
        }
    }

    fn hash(&self, opcode: Opcode) -> usize {
        (opcode % self.size as u64) as usize
    }

    fn lookup(&self, opcode: Opcode) -> Option<T> {
        let slot = &self.slots[self.hash(opcode)];
        match slot {
            Some(line) if line.tag == opcode => Some(line.value.clone()),
            _ => None,
        }
    }

    fn insert(&mut self, opcode: Opcode, value: T) {
        let idx = self.hash(opcode);
        self.slots[idx] = Some(CacheLine { tag: opcode, value });
    }

    fn flush(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}

// `vec![None; size]` needs `Clone` on the element; implement it manually
// so `Cache<T>` only requires `T: Clone`, not `Option<CacheLine<T>>: Default`.
impl<T: Clone> Clone for CacheLine<T> {
    fn clone(&self) -> Self {
        CacheLine {
            tag: self.tag,
            value: self.value.clone(),
        }
    }
}

/// Terminal producer bound to one mnemonic. Reached via one or more trie
/// paths (its primary stencil plus any `alias` stencils); `overlays` holds
/// every specialization registered against this leaf, sorted by
/// decreasing mask popcount.
#[derive(Debug, Clone)]
pub(crate) struct IFactory<A> {
    pub mnemonic: String,
    pub uid: u32,
    pub meta: Arc<InstMetaData>,
    pub extractor: Arc<dyn Extractor + Send + Sync>,
    pub annotation: Option<Arc<A>>,
    pub overlays: Vec<Overlay<A>>,
}

impl<A> IFactory<A> {
    fn info_for(&self, opcode: Opcode) -> IFactoryInfo<A> {
        for overlay in &self.overlays {
            if overlay.matches(opcode) {
                return IFactoryInfo {
                    mnemonic: overlay.mnemonic.clone(),
                    uid: overlay.uid,
                    meta: overlay.meta.clone(),
                    extractor: overlay.extractor.clone(),
                    annotation: overlay.annotation.clone(),
                };
            }
        }
        IFactoryInfo {
            mnemonic: self.mnemonic.clone(),
            uid: self.uid,
            meta: self.meta.clone(),
            extractor: self.extractor.clone(),
            annotation: self.annotation.clone(),
        }
    }
}

/// `{opinfo (from extractor), uinfo (micro-arch info)}`, bundled as
/// returned by `getInfo`.
#[derive(Debug)]
pub struct IFactoryInfo<A> {
    pub mnemonic: String,
    pub uid: u32,
    pub meta: Arc<InstMetaData>,
    pub extractor: Arc<dyn Extractor + Send + Sync>,
    pub annotation: Option<Arc<A>>,
}

impl<A> Clone for IFactoryInfo<A> {
    fn clone(&self) -> Self {
        IFactoryInfo {
            mnemonic: self.mnemonic.clone(),
            uid: self.uid,
            meta: self.meta.clone(),
            extractor: self.extractor.clone(),
            annotation: self.annotation.clone(),
        }
    }
}

/// A fully decoded instruction: identity plus extracted operands.
#[derive(Debug, Clone)]
pub struct Instruction<A> {
    pub mnemonic: String,
    pub uid: u32,
    pub opcode: Opcode,
    pub operands: OperandInfo,
    pub meta: Arc<InstMetaData>,
    pub annotation: Option<Arc<A>>,
}

/// Minimal trace record for `makeInstFromTrace`: an opcode plus the
/// mnemonic a trace stream claims it decodes to. When the two disagree
/// (the trace was produced by a different ISA revision, say), the trie's
/// answer is discarded in favor of a direct lookup by mnemonic.
#[derive(Debug, Clone)]
pub struct TraceInfo {
    pub opcode: Opcode,
    pub mnemonic: String,
}

/// Supplies pre-decoded operand info in place of bit-extraction, for
/// `makeInstDirectly`/`morphInst`.
pub trait ExtractorDirectInfo {
    fn mnemonic(&self) -> &str;
    fn uid(&self) -> Option<u32> {
        None
    }
    fn operand_info(&self) -> OperandInfo;
}

/// Everything needed to register one catalog instruction: its form,
/// primary stencil, any alias stencils, descent-skip and fixed-field
/// sets, and fully-built metadata/extractor/annotation.
pub struct InsertSpec<A> {
    pub mnemonic: String,
    pub form: &'static str,
    pub stencil: Opcode,
    pub aliases: Vec<Opcode>,
    pub ignore: Vec<String>,
    pub fixed: Vec<String>,
    /// Secondary lookup key (JSON `"factory"`); defaults to the mnemonic
    /// and is only registered separately when it differs.
    pub factory: Option<String>,
    pub meta: Arc<InstMetaData>,
    pub extractor: Arc<dyn Extractor + Send + Sync>,
    pub annotation: Option<Arc<A>>,
}

/// Everything needed to register one overlay against an already-inserted
/// base mnemonic.
pub struct OverlaySpec<A> {
    pub mnemonic: String,
    pub base_mnemonic: String,
    pub match_mask: u64,
    pub match_value: u64,
    pub meta: Arc<InstMetaData>,
    pub extractor: Arc<dyn Extractor + Send + Sync>,
    pub annotation: Option<Arc<A>>,
}

/// The trie root plus the two hot-path caches described in spec §4.5.
#[derive(Debug)]
pub struct DTable<A> {
    forms: FormRegistry,
    nodes: Vec<FactoryNode>,
    leaves: Vec<IFactory<A>>,
    mnemonic_to_leaf: HashMap<String, LeafRef>,
    factory_alias: HashMap<String, LeafRef>,
    pseudo: HashMap<String, LeafRef>,
    uid_to_leaf: Vec<LeafRef>,
    mnemonic_by_uid: Vec<String>,
    ocache: Cache<IFactoryInfo<A>>,
    icache: Cache<Arc<Instruction<A>>>,
}

impl<A> DTable<A> {
    pub fn new(forms: FormRegistry) -> Self {
        Self::with_cache_size(forms, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(forms: FormRegistry, cache_size: usize) -> Self {
        Self {
            forms,
            nodes: vec![FactoryNode::new_root_match_list()],
            leaves: Vec::new(),
            mnemonic_to_leaf: HashMap::new(),
            factory_alias: HashMap::new(),
            pseudo: HashMap::new(),
            uid_to_leaf: Vec::new(),
            mnemonic_by_uid: Vec::new(),
            ocache: Cache::new(cache_size),
            icache: Cache::new(cache_size),
        }
    }

    pub fn form_registry(&self) -> &FormRegistry {
        &self.forms
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn uid_for_mnemonic(&self, mnemonic: &str) -> Option<u32> {
        self.mnemonic_to_leaf
            .get(mnemonic)
            .map(|&r| self.leaves[r].uid)
    }

    pub fn mnemonic_for_uid(&self, uid: u32) -> Option<&str> {
        self.mnemonic_by_uid.get(uid as usize).map(|s| s.as_str())
    }

    /// A registered mnemonic's current metadata, extractor, and
    /// annotation, for a builder deriving an overlay from its base
    /// (spec §4.6: overlay metadata is a cloned-and-overridden copy of
    /// the base's, not a fresh one).
    pub fn leaf_info_for_mnemonic(
        &self,
        mnemonic: &str,
    ) -> Option<(Arc<InstMetaData>, Arc<dyn Extractor + Send + Sync>, Option<Arc<A>>)> {
        let &leaf_ref = self.mnemonic_to_leaf.get(mnemonic)?;
        let leaf = &self.leaves[leaf_ref];
        Some((leaf.meta.clone(), leaf.extractor.clone(), leaf.annotation.clone()))
    }

    fn next_uid(&self) -> u32 {
        self.mnemonic_by_uid.len() as u32
    }

    fn push_node(&mut self, node: FactoryNode) -> NodeRef {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn match_list_index(&self, opcode: Opcode) -> Option<usize> {
        match &self.nodes[0] {
            FactoryNode::MatchList { predicates, .. } => {
                predicates.iter().position(|p| p(opcode))
            }
            _ => unreachable!("node 0 is always the root MatchList"),
        }
    }

    // ---- insertion (spec §4.4 build_/buildLeaf_) -------------------------

    pub fn insert_instruction(&mut self, spec: InsertSpec<A>) -> Result<u32> {
        if self.mnemonic_to_leaf.contains_key(&spec.mnemonic) {
            return Err(MavisError::OpcodeConflict {
                mnemonic: spec.mnemonic.clone(),
                stencil: spec.stencil,
            });
        }
        let form = self
            .forms
            .lookup(spec.form)
            .ok_or_else(|| MavisError::UnknownForm {
                mnemonic: spec.mnemonic.clone(),
                form: spec.form.to_string(),
            })?
            .clone();

        let uid = self.next_uid();
        let leaf = IFactory {
            mnemonic: spec.mnemonic.clone(),
            uid,
            meta: spec.meta,
            extractor: spec.extractor,
            annotation: spec.annotation,
            overlays: Vec::new(),
        };
        let leaf_ref = self.leaves.len();
        self.leaves.push(leaf);

        self.build_insert_path(
            &form,
            spec.stencil,
            &spec.ignore,
            &spec.fixed,
            leaf_ref,
            false,
            &spec.mnemonic,
        )?;

        self.mnemonic_to_leaf.insert(spec.mnemonic.clone(), leaf_ref);
        self.uid_to_leaf.push(leaf_ref);
        self.mnemonic_by_uid.push(spec.mnemonic.clone());
        if let Some(factory_name) = spec.factory {
            if factory_name != spec.mnemonic {
                self.factory_alias.insert(factory_name, leaf_ref);
            }
        }

        for alias_stencil in spec.aliases {
            match self.build_insert_path(
                &form,
                alias_stencil,
                &spec.ignore,
                &spec.fixed,
                leaf_ref,
                true,
                &spec.mnemonic,
            ) {
                Ok(()) => {}
                Err(MavisError::InstructionAlias {
                    stencil,
                    mnemonic,
                    other,
                }) => {
                    log::warn!(
                        "alias stencil {stencil:#x} for '{mnemonic}' collides with '{other}', skipping"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(uid)
    }

    pub fn insert_overlay(&mut self, spec: OverlaySpec<A>) -> Result<u32> {
        let base_ref = *self
            .mnemonic_to_leaf
            .get(&spec.base_mnemonic)
            .ok_or_else(|| MavisError::OverlayMissingBase(spec.mnemonic.clone()))?;
        let uid = self.next_uid();
        let overlay = Overlay {
            mnemonic: spec.mnemonic.clone(),
            base_mnemonic: spec.base_mnemonic,
            match_mask: spec.match_mask,
            match_value: spec.match_value,
            meta: spec.meta,
            extractor: spec.extractor,
            annotation: spec.annotation,
            uid,
        };
        self.leaves[base_ref].overlays.push(overlay);
        sort_by_specificity(&mut self.leaves[base_ref].overlays);
        self.mnemonic_by_uid.push(spec.mnemonic.clone());
        // Overlays are reachable by mnemonic for direct construction, but
        // always resolve to the base leaf (they have no trie path of
        // their own — the base's path is what's matched, then refined).
        self.mnemonic_to_leaf.insert(spec.mnemonic, base_ref);
        Ok(uid)
    }

    /// Registers a pseudo-instruction: reachable by mnemonic for direct
    /// construction, never inserted into the dispatch trie (spec §4.7/§4.8).
    pub fn insert_pseudo(
        &mut self,
        mnemonic: impl Into<String>,
        meta: Arc<InstMetaData>,
        extractor: Arc<dyn Extractor + Send + Sync>,
        annotation: Option<Arc<A>>,
    ) -> u32 {
        let mnemonic = mnemonic.into();
        let uid = self.next_uid();
        let leaf = IFactory {
            mnemonic: mnemonic.clone(),
            uid,
            meta,
            extractor,
            annotation,
            overlays: Vec::new(),
        };
        let leaf_ref = self.leaves.len();
        self.leaves.push(leaf);
        self.pseudo.insert(mnemonic.clone(), leaf_ref);
        self.uid_to_leaf.push(leaf_ref);
        self.mnemonic_by_uid.push(mnemonic);
        uid
    }

    #[allow(clippy::too_many_arguments)]
    fn build_insert_path(
        &mut self,
        form: &Form,
        stencil: Opcode,
        ignore: &[String],
        fixed: &[String],
        leaf_ref: LeafRef,
        is_alias: bool,
        mnemonic: &str,
    ) -> Result<()> {
        let idx = self
            .match_list_index(stencil)
            .expect("the six root predicates partition all 64-bit opcode values");

        let fields = form.descent_fields().to_vec();
        let mut current = self.ensure_match_list_child(idx, fields[0])?;

        for i in 0..fields.len() - 1 {
            let field = fields[i];
            let next_field = fields[i + 1];
            let ignored = ignore.iter().any(|n| n == field.name());
            current = self.ensure_dense_child(current, field, next_field, ignored, stencil, mnemonic)?;
        }

        let last = fields[fields.len() - 1];
        let ignored_last = ignore.iter().any(|n| n == last.name());
        let special = self.ensure_special_child(current, last, ignored_last, stencil, mnemonic)?;

        self.install_leaf(special, fixed, form, stencil, leaf_ref, is_alias, mnemonic)
    }

    fn ensure_match_list_child(&mut self, idx: usize, field: Field) -> Result<NodeRef> {
        let existing = match &self.nodes[0] {
            FactoryNode::MatchList { children, .. } => children[idx],
            _ => unreachable!(),
        };
        if let Some(nr) = existing {
            if let FactoryNode::Dense { field: ef, .. } = &self.nodes[nr] {
                if !ef.is_equivalent(&field) {
                    return Err(MavisError::FieldsIncompatible {
                        mnemonic: String::new(),
                        field_a: ef.name().to_string(),
                        field_b: field.name().to_string(),
                    });
                }
            }
            return Ok(nr);
        }
        let nr = self.push_node(FactoryNode::new_dense(field));
        if let FactoryNode::MatchList { children, .. } = &mut self.nodes[0] {
            children[idx] = Some(nr);
        }
        Ok(nr)
    }

    fn ensure_dense_child(
        &mut self,
        parent: NodeRef,
        field: Field,
        next_field: Field,
        ignore: bool,
        stencil: Opcode,
        mnemonic: &str,
    ) -> Result<NodeRef> {
        let key = if ignore { None } else { Some(field.extract(stencil)) };
        let existing = match &self.nodes[parent] {
            FactoryNode::Dense { field: pf, children, default } => {
                if !pf.is_equivalent(&field) {
                    return Err(MavisError::FieldsIncompatible {
                        mnemonic: mnemonic.to_string(),
                        field_a: pf.name().to_string(),
                        field_b: field.name().to_string(),
                    });
                }
                match key {
                    Some(k) => children.get(&k).copied(),
                    None => *default,
                }
            }
            _ => unreachable!("descent only ever walks Dense nodes"),
        };
        if let Some(nr) = existing {
            if let FactoryNode::Dense { field: ef, .. } = &self.nodes[nr] {
                if !ef.is_equivalent(&next_field) {
                    return Err(MavisError::FieldsIncompatible {
                        mnemonic: mnemonic.to_string(),
                        field_a: ef.name().to_string(),
                        field_b: next_field.name().to_string(),
                    });
                }
            }
            return Ok(nr);
        }
        let nr = self.push_node(FactoryNode::new_dense(next_field));
        if let FactoryNode::Dense { children, default, .. } = &mut self.nodes[parent] {
            match key {
                Some(k) => {
                    children.insert(k, nr);
                }
                None => *default = Some(nr),
            }
        }
        Ok(nr)
    }

    fn ensure_special_child(
        &mut self,
        parent: NodeRef,
        field: Field,
        ignore: bool,
        stencil: Opcode,
        mnemonic: &str,
    ) -> Result<NodeRef> {
        let key = if ignore { None } else { Some(field.extract(stencil)) };
        let existing = match &self.nodes[parent] {
            FactoryNode::Dense { field: pf, children, default } => {
                if !pf.is_equivalent(&field) {
                    return Err(MavisError::FieldsIncompatible {
                        mnemonic: mnemonic.to_string(),
                        field_a: pf.name().to_string(),
                        field_b: field.name().to_string(),
                    });
                }
                match key {
                    Some(k) => children.get(&k).copied(),
                    None => *default,
                }
            }
            _ => unreachable!(),
        };
        if let Some(nr) = existing {
            return Ok(nr);
        }
        let nr = self.push_node(FactoryNode::new_special_case());
        if let FactoryNode::Dense { children, default, .. } = &mut self.nodes[parent] {
            match key {
                Some(k) => {
                    children.insert(k, nr);
                }
                None => *default = Some(nr),
            }
        }
        Ok(nr)
    }

    fn install_leaf(
        &mut self,
        special: NodeRef,
        fixed: &[String],
        form: &Form,
        stencil: Opcode,
        leaf_ref: LeafRef,
        is_alias: bool,
        mnemonic: &str,
    ) -> Result<()> {
        let collision = |mnemonic: &str, stencil: Opcode, other: LeafRef, leaves: &[IFactory<A>]| {
            if is_alias {
                MavisError::InstructionAlias {
                    stencil,
                    mnemonic: mnemonic.to_string(),
                    other: leaves[other].mnemonic.clone(),
                }
            } else {
                MavisError::OpcodeConflict {
                    mnemonic: mnemonic.to_string(),
                    stencil,
                }
            }
        };

        if !fixed.is_empty() {
            // An unconditional primary already installed here would match
            // every opcode on this path, including this fixed-field case.
            if let FactoryNode::SpecialCase { primary: Some(other), .. } = &self.nodes[special] {
                let other = *other;
                return Err(collision(mnemonic, stencil, other, &self.leaves));
            }
            let mut mask = 0u64;
            for name in fixed {
                let f = form.field(name).ok_or_else(|| MavisError::UnknownField {
                    mnemonic: mnemonic.to_string(),
                    field: name.clone(),
                    form: form.name().to_string(),
                })?;
                mask |= f.mask();
            }
            let value = stencil & mask;
            let FactoryNode::SpecialCase { fixed: cases, .. } = &mut self.nodes[special] else {
                unreachable!()
            };
            if let Some(existing) = cases.iter().find(|c| c.mask == mask && c.value == value) {
                let other = existing.leaf;
                return Err(collision(mnemonic, stencil, other, &self.leaves));
            }
            cases.push(FixedCase { mask, value, leaf: leaf_ref });
            cases.sort_by(|a, b| b.mask.count_ones().cmp(&a.mask.count_ones()));
            return Ok(());
        }

        // No fixed fields declared: this instruction claims the whole
        // path unconditionally. That's incompatible with any
        // fixed-field case already registered here (ambiguous overlap).
        if let FactoryNode::SpecialCase { fixed: cases, .. } = &self.nodes[special] {
            if let Some(existing) = cases.first() {
                let other = existing.leaf;
                return Err(collision(mnemonic, stencil, other, &self.leaves));
            }
        }

        let FactoryNode::SpecialCase { primary, default, .. } = &mut self.nodes[special] else {
            unreachable!()
        };
        if primary.is_none() {
            *primary = Some(leaf_ref);
            return Ok(());
        }
        let primary_ref = primary.unwrap();
        // The `default` slot only ever holds a second path to the *same*
        // leaf (a genuine alias stencil landing on this node too). A
        // different, unrelated leaf with no fixed fields is ambiguous
        // with `primary` and must be rejected, not silently shadowed.
        if default.is_none() && is_alias && leaf_ref == primary_ref {
            *default = Some(leaf_ref);
            return Ok(());
        }
        Err(collision(mnemonic, stencil, primary_ref, &self.leaves))
    }

    // ---- decode (spec §4.4 getInfo / §4.5 caches) -------------------------

    fn descend(&self, opcode: Opcode) -> Option<LeafRef> {
        let idx = self.match_list_index(opcode)?;
        let mut current = match &self.nodes[0] {
            FactoryNode::MatchList { children, .. } => (*children.get(idx)?)?,
            _ => unreachable!(),
        };
        loop {
            match &self.nodes[current] {
                FactoryNode::Dense { field, children, default } => {
                    let key = field.extract(opcode);
                    current = children.get(&key).copied().or(*default)?;
                }
                FactoryNode::SpecialCase { primary, default, fixed } => {
                    for case in fixed {
                        if (opcode & case.mask) == case.value {
                            return Some(case.leaf);
                        }
                    }
                    return primary.or(*default);
                }
                FactoryNode::MatchList { .. } => unreachable!("MatchList only ever at the root"),
            }
        }
    }

    pub fn get_info(&mut self, opcode: Opcode) -> Result<IFactoryInfo<A>> {
        if let Some(info) = self.ocache.lookup(opcode) {
            return Ok(info);
        }
        let leaf_ref = self.descend(opcode).ok_or(MavisError::UnknownOpcode(opcode))?;
        let info = self.leaves[leaf_ref].info_for(opcode);
        self.ocache.insert(opcode, info.clone());
        Ok(info)
    }

    pub fn make_inst(&mut self, opcode: Opcode) -> Result<Arc<Instruction<A>>> {
        if let Some(inst) = self.icache.lookup(opcode) {
            return Ok(inst);
        }
        let info = self.get_info(opcode)?;
        let form = self
            .forms
            .lookup(info.meta.form)
            .expect("a registered leaf always names a registered form");
        let operands = info.extractor.extract(opcode, form, &info.meta);
        let inst = Arc::new(Instruction {
            mnemonic: info.mnemonic,
            uid: info.uid,
            opcode,
            operands,
            meta: info.meta,
            annotation: info.annotation,
        });
        self.icache.insert(opcode, inst.clone());
        Ok(inst)
    }

    pub fn make_inst_from_trace(&mut self, trace: &TraceInfo) -> Result<Arc<Instruction<A>>> {
        let inst = self.make_inst(trace.opcode)?;
        if inst.mnemonic == trace.mnemonic {
            return Ok(inst);
        }
        let leaf_ref = *self
            .mnemonic_to_leaf
            .get(&trace.mnemonic)
            .or_else(|| self.pseudo.get(&trace.mnemonic))
            .ok_or_else(|| MavisError::UnknownMnemonic(trace.mnemonic.clone()))?;
        let info = self.leaves[leaf_ref].info_for(trace.opcode);
        let inst = Arc::new(Instruction {
            mnemonic: info.mnemonic,
            uid: info.uid,
            opcode: trace.opcode,
            operands: OperandInfo::default(),
            meta: info.meta,
            annotation: info.annotation,
        });
        self.icache.insert(trace.opcode, inst.clone());
        Ok(inst)
    }

    fn find_leaf(&self, mnemonic: &str, uid: Option<u32>) -> Result<LeafRef> {
        if let Some(uid) = uid {
            return self
                .uid_to_leaf
                .get(uid as usize)
                .copied()
                .ok_or_else(|| MavisError::UnknownMnemonic(mnemonic.to_string()));
        }
        self.mnemonic_to_leaf
            .get(mnemonic)
            .or_else(|| self.pseudo.get(mnemonic))
            .or_else(|| self.factory_alias.get(mnemonic))
            .copied()
            .ok_or_else(|| MavisError::UnknownMnemonic(mnemonic.to_string()))
    }

    pub fn make_inst_directly(&self, direct: &dyn ExtractorDirectInfo) -> Result<Arc<Instruction<A>>> {
        let leaf_ref = self.find_leaf(direct.mnemonic(), direct.uid())?;
        let leaf = &self.leaves[leaf_ref];
        Ok(Arc::new(Instruction {
            mnemonic: leaf.mnemonic.clone(),
            uid: leaf.uid,
            opcode: 0,
            operands: direct.operand_info(),
            meta: leaf.meta.clone(),
            annotation: leaf.annotation.clone(),
        }))
    }

    pub fn morph_inst(&self, inst: &mut Instruction<A>, direct: &dyn ExtractorDirectInfo) -> Result<()> {
        let leaf_ref = self.find_leaf(direct.mnemonic(), direct.uid())?;
        let leaf = &self.leaves[leaf_ref];
        inst.mnemonic = leaf.mnemonic.clone();
        inst.uid = leaf.uid;
        inst.operands = direct.operand_info();
        inst.meta = leaf.meta.clone();
        inst.annotation = leaf.annotation.clone();
        Ok(())
    }

    pub fn flush_caches(&mut self) {
        self.icache.flush();
        self.ocache.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractorRegistry;

    fn meta(mnemonic: &str, form: &'static str) -> Arc<InstMetaData> {
        Arc::new(InstMetaData::new(mnemonic, form))
    }

    fn dt() -> DTable<()> {
        DTable::new(FormRegistry::new())
    }

    fn insert(dt: &mut DTable<()>, mnemonic: &str, form: &'static str, stencil: Opcode) -> u32 {
        dt.insert_instruction(InsertSpec {
            mnemonic: mnemonic.to_string(),
            form,
            stencil,
            aliases: vec![],
            ignore: vec!["rd".into(), "rs1".into(), "imm".into(), "rd_rs1".into(), "rs2".into()],
            fixed: vec![],
            factory: None,
            meta: meta(mnemonic, form),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap()
    }

    #[test]
    fn compressed_add_decodes_by_mnemonic() {
        let mut dt = dt();
        insert(&mut dt, "c.add", "CR", 0x9002);
        let info = dt.get_info(0x9002).unwrap();
        assert_eq!(info.mnemonic, "c.add");
    }

    #[test]
    fn unmatched_opcode_is_unknown() {
        let mut dt = dt();
        insert(&mut dt, "addi", "I", 0x0000_0013);
        let err = dt.get_info(0x0000_0033).unwrap_err();
        assert_eq!(err, MavisError::UnknownOpcode(0x0000_0033));
    }

    #[test]
    fn overlay_rebinds_mnemonic_on_match_only() {
        let mut dt = dt();
        insert(&mut dt, "addi", "I", 0x0000_0013);
        dt.insert_overlay(OverlaySpec {
            mnemonic: "nop".to_string(),
            base_mnemonic: "addi".to_string(),
            match_mask: 0xffff_ffff,
            match_value: 0x0000_0013,
            meta: meta("nop", "I"),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap();

        assert_eq!(dt.get_info(0x0000_0013).unwrap().mnemonic, "nop");
        // addi x1, x0, 1: opcode=0x13, funct3=0, rd=1, rs1=0, imm=1
        assert_eq!(dt.get_info(0x0010_0093).unwrap().mnemonic, "addi");
    }

    #[test]
    fn alias_stencil_decodes_to_same_mnemonic() {
        let mut dt = dt();
        dt.insert_instruction(InsertSpec {
            mnemonic: "jal".to_string(),
            form: "J",
            stencil: 0x0000_006f,
            aliases: vec![0x8000_00ef],
            ignore: vec!["rd".into(), "imm".into()],
            fixed: vec![],
            factory: None,
            meta: meta("jal", "J"),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap();
        assert_eq!(dt.get_info(0x0000_006f).unwrap().mnemonic, "jal");
        assert_eq!(dt.get_info(0x8000_00ef).unwrap().mnemonic, "jal");
    }

    #[test]
    fn fixed_field_disambiguates_shared_path() {
        let mut dt = dt();
        dt.insert_instruction(InsertSpec {
            mnemonic: "srli".to_string(),
            form: "R",
            stencil: 0x0000_5013,
            aliases: vec![],
            ignore: vec!["rd".into(), "rs1".into(), "rs2".into(), "funct7".into()],
            fixed: vec!["funct7".into()],
            factory: None,
            meta: meta("srli", "R"),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap();
        dt.insert_instruction(InsertSpec {
            mnemonic: "srai".to_string(),
            form: "R",
            stencil: 0x4000_5013,
            aliases: vec![],
            ignore: vec!["rd".into(), "rs1".into(), "rs2".into(), "funct7".into()],
            fixed: vec!["funct7".into()],
            factory: None,
            meta: meta("srai", "R"),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap();

        assert_eq!(dt.get_info(0x0000_5013).unwrap().mnemonic, "srli");
        assert_eq!(dt.get_info(0x4000_5013).unwrap().mnemonic, "srai");
    }

    #[test]
    fn no_fixed_distinguisher_is_opcode_conflict() {
        let mut dt = dt();
        // srli/srai legitimately share opcode+funct3 but distinguish via
        // a "fixed" funct7 bit (see fixed_field_disambiguates_shared_path).
        dt.insert_instruction(InsertSpec {
            mnemonic: "srli".to_string(),
            form: "R",
            stencil: 0x0000_5013,
            aliases: vec![],
            ignore: vec!["rd".into(), "rs1".into(), "rs2".into(), "funct7".into()],
            fixed: vec!["funct7".into()],
            factory: None,
            meta: meta("srli", "R"),
            extractor: ExtractorRegistry::default_extractor(),
            annotation: None,
        })
        .unwrap();

        // A third instruction on the same path with no fixed distinguisher
        // would unconditionally shadow the two fixed cases: reject it.
        let err = dt
            .insert_instruction(InsertSpec {
                mnemonic: "shift_whatever".to_string(),
                form: "R",
                stencil: 0x0000_5013,
                aliases: vec![],
                ignore: vec!["rd".into(), "rs1".into(), "rs2".into(), "funct7".into()],
                fixed: vec![],
                factory: None,
                meta: meta("shift_whatever", "R"),
                extractor: ExtractorRegistry::default_extractor(),
                annotation: None,
            })
            .unwrap_err();
        assert!(matches!(err, MavisError::OpcodeConflict { .. }));
    }

    #[test]
    fn second_unrelated_mnemonic_with_no_fixed_distinguisher_is_opcode_conflict() {
        let mut dt = dt();
        insert(&mut dt, "foo", "I", 0x13);

        // "bar" is a distinct instruction, not an alias of "foo": it must
        // not silently fall into the node's `default` slot and become
        // permanently unreachable.
        let err = dt
            .insert_instruction(InsertSpec {
                mnemonic: "bar".to_string(),
                form: "I",
                stencil: 0x13,
                aliases: vec![],
                ignore: vec!["rd".into(), "rs1".into(), "imm".into()],
                fixed: vec![],
                factory: None,
                meta: meta("bar", "I"),
                extractor: ExtractorRegistry::default_extractor(),
                annotation: None,
            })
            .unwrap_err();
        assert!(matches!(err, MavisError::OpcodeConflict { .. }));
        assert_eq!(dt.get_info(0x13).unwrap().mnemonic, "foo");
    }

    #[test]
    fn cache_hit_then_flush_then_miss() {
        let mut dt = dt();
        insert(&mut dt, "addi", "I", 0x0000_0013);
        let a = dt.make_inst(0x0000_0013).unwrap();
        let b = dt.make_inst(0x0000_0013).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        dt.flush_caches();
        let c = dt.make_inst(0x0000_0013).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.mnemonic, c.mnemonic);
    }
}
