//! JSON catalog builder for `mavis-core`: parses declarative instruction
//! and annotation catalogs into a `DTable<UArchInfo>`.
//!
//! Owns every JSON-facing concern the core crate stays blind to: file
//! I/O, `serde_json` deserialization, tag-based inclusion/exclusion
//! filtering, the two-pass expand/overlay build order, and the
//! micro-architectural annotation registry.

mod annotation;
mod builder;
mod direct;
mod error;
mod json;
mod metadata;
mod pseudo;
mod tags;

pub use annotation::{AnnotationRegistry, IssueTarget, UArchInfo, Unit};
pub use builder::{Builder, Catalog, Source};
pub use direct::DirectInfo;
pub use error::{CatalogError, Result};
