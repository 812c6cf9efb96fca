//! Errors from trie construction and decoding (spec §7, core-facing subset;
//! file/JSON/annotation errors live in `mavis-catalog::CatalogError`).

use thiserror::Error;

use crate::field::Opcode;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MavisError {
    #[error("opcode {0:#x} matched no instruction")]
    UnknownOpcode(Opcode),

    #[error("no instruction registered under mnemonic '{0}'")]
    UnknownMnemonic(String),

    #[error("stencil {stencil:#x} for '{mnemonic}' collides with an existing leaf at the same trie path")]
    OpcodeConflict { mnemonic: String, stencil: Opcode },

    #[error("form field '{field_a}' is not equivalent to '{field_b}' on a shared trie path (mnemonic '{mnemonic}')")]
    FieldsIncompatible {
        mnemonic: String,
        field_a: String,
        field_b: String,
    },

    /// Non-fatal during alias processing: logged and skipped by the
    /// builder, never returned to a caller that isn't the builder itself.
    #[error("stencil {stencil:#x} for alias of '{mnemonic}' collides with existing mnemonic '{other}'")]
    InstructionAlias {
        stencil: Opcode,
        mnemonic: String,
        other: String,
    },

    #[error("overlay '{0}' is missing a 'base' mnemonic")]
    OverlayMissingBase(String),

    #[error("overlay '{0}' has a malformed match spec (expected [mask, value] hex strings)")]
    OverlayBadMatchSpec(String),

    #[error("overlay '{0}' is missing its 'match' field")]
    OverlayMissingMatch(String),

    #[error("unknown form '{form}' named by mnemonic '{mnemonic}'")]
    UnknownForm { mnemonic: String, form: String },

    #[error("'{field}' in 'fixed' for '{mnemonic}' is not a field of form '{form}'")]
    UnknownField {
        mnemonic: String,
        field: String,
        form: String,
    },
}

pub type Result<T> = std::result::Result<T, MavisError>;
