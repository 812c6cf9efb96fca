//! A concrete `ExtractorDirectInfo` for callers that already have operand
//! values in hand (the CLI's `direct` subcommand, trace replay, tests) and
//! want to build an `Instruction` without going through the trie.

use mavis_core::{ExtractorDirectInfo, OperandInfo};

#[derive(Debug, Clone)]
pub struct DirectInfo {
    pub mnemonic: String,
    pub uid: Option<u32>,
    pub operands: OperandInfo,
}

impl DirectInfo {
    pub fn new(mnemonic: impl Into<String>, operands: OperandInfo) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            uid: None,
            operands,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}

impl ExtractorDirectInfo for DirectInfo {
    fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    fn uid(&self) -> Option<u32> {
        self.uid
    }

    fn operand_info(&self) -> OperandInfo {
        self.operands.clone()
    }
}
