//! Decode dispatch trie and form/field extraction model for a
//! variable-length RISC-style ISA.
//!
//! This crate implements the hard engineering described by the project's
//! decoder core: `Field`/`Form` (named bit-slices and their layouts),
//! `Extractor` (operand decoding bound to a form), `InstMetaData` (static
//! per-instruction attributes), the `FactoryNode` dispatch trie, `Overlay`
//! (mnemonic-rewriting specializations), and `DTable` (the trie root plus
//! its two hot-path caches).
//!
//! It knows nothing about JSON, files, or the command line — see
//! `mavis-catalog` for the builder that populates a `DTable` from
//! declarative catalogs.

mod dtable;
mod error;
mod extractor;
mod factory;
mod field;
mod form;
mod meta;
mod operand;
mod overlay;

pub use dtable::{
    DTable, ExtractorDirectInfo, IFactoryInfo, InsertSpec, Instruction, OverlaySpec, TraceInfo,
    DEFAULT_CACHE_SIZE,
};
pub use error::{MavisError, Result};
pub use extractor::{Extractor, ExtractorRegistry, FormGenericExtractor};
pub use field::{Field, Opcode};
pub use form::{Form, FormRegistry};
pub use meta::{InstMetaData, IsaSet};
pub use operand::{OperandField, OperandInfo, OperandType, RegFile};
pub use overlay::Overlay;
