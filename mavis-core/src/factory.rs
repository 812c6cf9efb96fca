//! The dispatch trie's node types. Arena-indexed (design note: "arena
//! allocated nodes with indices") rather than reference-counted, since the
//! node set is closed and built once during `configure`.

use std::collections::HashMap;

use crate::field::{Field, Opcode};

pub(crate) type NodeRef = usize;
pub(crate) type LeafRef = usize;

/// A fixed-field disambiguation case inside a `SpecialCase` node: matches
/// when `(opcode & mask) == value`.
#[derive(Debug, Clone)]
pub(crate) struct FixedCase {
    pub mask: u64,
    pub value: u64,
    pub leaf: LeafRef,
}

/// A node in the dispatch trie. `Leaf` itself is not a variant here: every
/// insertion terminates in a `SpecialCase`, which holds `LeafRef`s
/// directly — see spec §4.4's `buildLeaf_`, which always installs into a
/// `SpecialCase` slot.
#[derive(Debug, Clone)]
pub(crate) enum FactoryNode {
    /// O(1) dispatch on a selector field's extracted value.
    Dense {
        field: Field,
        children: HashMap<u64, NodeRef>,
        default: Option<NodeRef>,
    },
    /// First-match dispatch at the root, partitioning opcodes by encoding
    /// length class.
    MatchList {
        predicates: Vec<fn(Opcode) -> bool>,
        children: Vec<Option<NodeRef>>,
    },
    /// Terminal disambiguation via fixed bit patterns.
    SpecialCase {
        primary: Option<LeafRef>,
        default: Option<LeafRef>,
        fixed: Vec<FixedCase>,
    },
}

impl FactoryNode {
    pub fn new_dense(field: Field) -> Self {
        FactoryNode::Dense {
            field,
            children: HashMap::new(),
            default: None,
        }
    }

    pub fn new_special_case() -> Self {
        FactoryNode::SpecialCase {
            primary: None,
            default: None,
            fixed: Vec::new(),
        }
    }

    /// The six-predicate root required by the reference ISA family
    /// (spec §4.4): partitions opcodes into 16-bit compressed, 32-bit
    /// standard, and progressively wider reserved encoding classes.
    pub fn new_root_match_list() -> Self {
        let predicates: Vec<fn(Opcode) -> bool> = vec![
            |op| (op & 0x3) != 0x3,
            |op| (op & 0x3) == 0x3 && (op & 0x1c) != 0x1c,
            |op| (op & 0x3f) == 0x1f,
            |op| (op & 0x7f) == 0x3f,
            |op| (op & 0x7f) == 0x7f && (op & 0x7000) != 0x7000,
            |op| (op & 0x707f) == 0x707f,
        ];
        FactoryNode::MatchList {
            children: vec![None; predicates.len()],
            predicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_predicates_select_expected_class_for_known_opcodes() {
        let root = FactoryNode::new_root_match_list();
        let FactoryNode::MatchList { predicates, .. } = root else {
            panic!("expected MatchList");
        };
        // c.add (0x9002) is a 16-bit compressed opcode: class 0.
        assert_eq!(predicates.iter().position(|p| p(0x9002)), Some(0));
        // addi (0x00000013) is a standard 32-bit opcode: class 1.
        assert_eq!(predicates.iter().position(|p| p(0x0000_0013)), Some(1));
    }
}
