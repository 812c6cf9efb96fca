//! Minimal `PseudoBuilder`: registers a synthetic, mnemonic-only factory
//! that never touches the dispatch trie (spec §4.7, original_source
//! `PseudoBuilder.hpp`).

use std::sync::Arc;

use serde_json::Value;

use mavis_core::ExtractorRegistry;

use crate::annotation::AnnotationRegistry;
use crate::builder::Catalog;
use crate::error::Result;
use crate::json::as_string;
use crate::metadata::parse_meta;

/// `entry` carries the synthetic mnemonic in its `"pseudo"` key rather
/// than `"mnemonic"`; a `"form"` is still required so the extractor has
/// something to bind to when a pseudo instruction is later materialized
/// via `makeInstDirectly`.
pub fn build_pseudo(
    entry: &Value,
    forms: &mavis_core::FormRegistry,
    extractors: &ExtractorRegistry,
    annotations: &AnnotationRegistry,
    dtable: &mut Catalog,
) -> Result<()> {
    let mnemonic = as_string(entry, "pseudo").expect("caller checked entry has a 'pseudo' key");
    let form_name: &'static str = match entry.get("form").and_then(Value::as_str) {
        Some(name) => forms
            .lookup(name)
            .map(|f| f.name())
            .ok_or_else(|| mavis_core::MavisError::UnknownForm {
                mnemonic: mnemonic.clone(),
                form: name.to_string(),
            })?,
        None => "I",
    };
    let meta = parse_meta(&mnemonic, form_name, entry);
    let extractor = match entry.get("xform").and_then(Value::as_str) {
        Some(name) => extractors.named(name).unwrap_or_else(ExtractorRegistry::default_extractor),
        None => ExtractorRegistry::default_extractor(),
    };
    let annotation = annotations.find(&mnemonic);
    dtable.insert_pseudo(mnemonic, Arc::new(meta), extractor, annotation);
    Ok(())
}
