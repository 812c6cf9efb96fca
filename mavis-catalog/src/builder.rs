//! Consumes JSON catalogs, allocates metadata, registers factories, and
//! assigns unique IDs (spec §4.7).

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use mavis_core::{
    DTable, ExtractorRegistry, FormRegistry, InsertSpec, MavisError, OverlaySpec,
};

use crate::annotation::{AnnotationRegistry, UArchInfo};
use crate::error::{CatalogError, Result};
use crate::json::{as_hex_u64, as_string};
use crate::metadata::{mnemonic_of, parse_meta, parse_operand_types};
use crate::pseudo::build_pseudo;
use crate::tags::keep;

/// The catalog's concrete `DTable`: annotations are this crate's own
/// `UArchInfo`, not a type parameter the crate leaves open. `mavis-core`
/// stays generic for embedders with a different annotation model.
pub type Catalog = DTable<UArchInfo>;

/// One JSON source to process, labeled for error messages.
pub struct Source {
    pub label: String,
    pub contents: String,
}

impl Source {
    pub fn from_path(path: impl AsRef<Path>) -> std::result::Result<Self, (String, std::io::Error)> {
        let path = path.as_ref();
        let label = path.display().to_string();
        fs::read_to_string(path)
            .map(|contents| Source { label: label.clone(), contents })
            .map_err(|e| (label, e))
    }
}

/// Deferred entry: original file label plus the parsed JSON object,
/// processed only after every file's primary entries have been inserted.
struct Deferred {
    file: String,
    entry: Value,
}

pub struct Builder {
    forms: FormRegistry,
    extractors: ExtractorRegistry,
    cache_size: usize,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            forms: FormRegistry::new(),
            extractors: ExtractorRegistry::new(),
            cache_size: mavis_core::DEFAULT_CACHE_SIZE,
        }
    }

    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Registers a named `xform` extractor, available to instructions and
    /// overlays that name it.
    pub fn register_extractor(
        &mut self,
        name: impl Into<String>,
        extractor: Arc<dyn mavis_core::Extractor + Send + Sync>,
    ) -> &mut Self {
        self.extractors.register(name, extractor);
        self
    }

    /// Reads and builds from files on disk.
    pub fn configure(
        &self,
        isa_files: &[impl AsRef<Path>],
        annotation_files: &[impl AsRef<Path>],
        inclusions: &HashSet<String>,
        exclusions: &HashSet<String>,
    ) -> Result<Catalog> {
        let isa_sources = isa_files
            .iter()
            .map(Source::from_path)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|(path, source)| CatalogError::BadISAFile { path, source })?;
        let annotation_sources = annotation_files
            .iter()
            .map(Source::from_path)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|(path, source)| CatalogError::BadAnnotationFile { path, source })?;
        self.configure_from_sources(&isa_sources, &annotation_sources, inclusions, exclusions)
    }

    /// Builds from already-loaded source text; the path `configure` and
    /// `mavis-catalog/tests/end_to_end.rs` both funnel through.
    pub fn configure_from_sources(
        &self,
        isa_sources: &[Source],
        annotation_sources: &[Source],
        inclusions: &HashSet<String>,
        exclusions: &HashSet<String>,
    ) -> Result<Catalog> {
        let mut annotations = AnnotationRegistry::new();
        for src in annotation_sources {
            annotations.load_file(&src.label, &src.contents)?;
        }

        let mut dtable = DTable::with_cache_size(FormRegistry::new(), self.cache_size);
        let mut deferred_expand: Vec<Deferred> = Vec::new();
        let mut deferred_overlay: Vec<Deferred> = Vec::new();

        for src in isa_sources {
            let parsed: Value =
                serde_json::from_str(&src.contents).map_err(|source| CatalogError::BadISAFileJson {
                    path: src.label.clone(),
                    source,
                })?;
            let entries = parsed.as_array().cloned().unwrap_or_default();

            for entry in entries {
                let tags: HashSet<String> = crate::json::as_string_list(entry.get("tags").unwrap_or(&Value::Null))
                    .into_iter()
                    .collect();
                if !keep(&tags, inclusions, exclusions) {
                    continue;
                }

                if entry.get("pseudo").and_then(Value::as_str).is_some() {
                    build_pseudo(&entry, &self.forms, &self.extractors, &annotations, &mut dtable)?;
                    continue;
                }
                if entry.get("overlay").is_some() {
                    deferred_overlay.push(Deferred { file: src.label.clone(), entry });
                    continue;
                }
                if entry.get("expand").is_some() {
                    deferred_expand.push(Deferred { file: src.label.clone(), entry });
                    continue;
                }
                self.insert_primary(&mut dtable, &annotations, &src.label, &entry)?;
            }
        }

        for d in &deferred_expand {
            self.insert_primary(&mut dtable, &annotations, &d.file, &d.entry)?;
        }
        for d in &deferred_overlay {
            self.insert_overlay(&mut dtable, &annotations, &d.file, &d.entry)?;
        }

        Ok(dtable)
    }

    fn insert_primary(
        &self,
        dtable: &mut Catalog,
        annotations: &AnnotationRegistry,
        file: &str,
        entry: &Value,
    ) -> Result<()> {
        let mnemonic = mnemonic_of(file, entry, as_string(entry, "stencil"))?;
        let form_name = as_string(entry, "form").ok_or_else(|| CatalogError::UnknownForm {
            file: file.to_string(),
            mnemonic: mnemonic.clone(),
            form: String::new(),
        })?;
        let form = self
            .forms
            .lookup(&form_name)
            .ok_or_else(|| CatalogError::UnknownForm {
                file: file.to_string(),
                mnemonic: mnemonic.clone(),
                form: form_name.clone(),
            })?;
        let stencil = entry
            .get("stencil")
            .and_then(as_hex_u64)
            .ok_or_else(|| CatalogError::MissingStencil {
                file: file.to_string(),
                mnemonic: mnemonic.clone(),
            })?;
        let aliases = entry
            .get("alias")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| match as_hex_u64(v) {
                        Some(h) => Some(h),
                        None => {
                            log::warn!("'{mnemonic}' in '{file}': unparseable alias stencil, skipping");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let meta = parse_meta(&mnemonic, form.name(), entry);
        let extractor = match entry.get("xform").and_then(Value::as_str) {
            Some(name) => self
                .extractors
                .named(name)
                .unwrap_or_else(ExtractorRegistry::default_extractor),
            None => ExtractorRegistry::default_extractor(),
        };
        let factory = as_string(entry, "factory");
        let annotation = annotations.find(&mnemonic);

        let spec = InsertSpec {
            mnemonic,
            form: form.name(),
            stencil,
            aliases,
            ignore: meta.ignore.clone(),
            fixed: meta.fixed.clone(),
            factory,
            meta: Arc::new(meta),
            extractor,
            annotation,
        };
        dtable.insert_instruction(spec).map_err(CatalogError::from)?;
        Ok(())
    }

    fn insert_overlay(
        &self,
        dtable: &mut Catalog,
        annotations: &AnnotationRegistry,
        file: &str,
        entry: &Value,
    ) -> Result<()> {
        let mnemonic = mnemonic_of(file, entry, None)?;
        let overlay_obj = entry.get("overlay").expect("caller checked 'overlay' is present");
        let base = as_string(overlay_obj, "base").ok_or_else(|| CatalogError::OverlayMissingBase(mnemonic.clone()))?;
        let match_arr = overlay_obj
            .get("match")
            .ok_or(MavisError::OverlayMissingMatch(mnemonic.clone()))
            .map_err(CatalogError::from)?;
        let pair = match_arr.as_array().filter(|a| a.len() == 2);
        let (match_mask, match_value) = match pair.and_then(|a| Some((as_hex_u64(&a[0])?, as_hex_u64(&a[1])?))) {
            Some(mv) => mv,
            None => return Err(MavisError::OverlayBadMatchSpec(mnemonic).into()),
        };

        let (base_meta, base_extractor, base_annotation) = dtable
            .leaf_info_for_mnemonic(&base)
            .ok_or_else(|| CatalogError::OverlayMissingBase(mnemonic.clone()))?;

        let overrides = parse_operand_types(entry);
        let mut overlay_meta = base_meta.derive_with_overrides(&overrides);
        overlay_meta.mnemonic = mnemonic.clone();

        let extractor = match entry.get("xform").and_then(Value::as_str) {
            Some(name) => self.extractors.named(name).unwrap_or(base_extractor),
            None => base_extractor,
        };
        let annotation = annotations.find(&mnemonic).or(base_annotation);

        let spec = OverlaySpec {
            mnemonic,
            base_mnemonic: base,
            match_mask,
            match_value,
            meta: Arc::new(overlay_meta),
            extractor,
            annotation,
        };
        dtable.insert_overlay(spec).map_err(CatalogError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(label: &str, contents: &str) -> Source {
        Source { label: label.to_string(), contents: contents.to_string() }
    }

    #[test]
    fn compressed_add_builds_and_decodes() {
        let builder = Builder::new();
        let isa = vec![src("isa.json", r#"[{"mnemonic":"c.add","form":"CR","stencil":"0x9002","dests":["rd_rs1"],"sources":["rs2"]}]"#)];
        let dt = builder
            .configure_from_sources(&isa, &[], &HashSet::new(), &HashSet::new())
            .unwrap();
        let mut dt = dt;
        assert_eq!(dt.get_info(0x9002).unwrap().mnemonic, "c.add");
    }

    #[test]
    fn overlay_builds_from_json() {
        let builder = Builder::new();
        let isa = vec![src(
            "isa.json",
            r#"[
                {"mnemonic":"addi","form":"I","stencil":"0x00000013","ignore":["rd","rs1","imm"],"sources":["rs1","imm"],"dests":["rd"]},
                {"mnemonic":"nop","overlay":{"base":"addi","match":["0xffffffff","0x00000013"]}}
            ]"#,
        )];
        let mut dt = builder
            .configure_from_sources(&isa, &[], &HashSet::new(), &HashSet::new())
            .unwrap();
        assert_eq!(dt.get_info(0x0000_0013).unwrap().mnemonic, "nop");
        assert_eq!(dt.get_info(0x0010_0093).unwrap().mnemonic, "addi");
    }

    #[test]
    fn missing_mnemonic_is_rejected() {
        let builder = Builder::new();
        let isa = vec![src("isa.json", r#"[{"form":"I","stencil":"0x13"}]"#)];
        let err = builder
            .configure_from_sources(&isa, &[], &HashSet::new(), &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingMnemonic { .. }));
    }

    #[test]
    fn tag_filter_excludes_nonmatching_entries() {
        let builder = Builder::new();
        let isa = vec![src(
            "isa.json",
            r#"[
                {"mnemonic":"addi","form":"I","stencil":"0x00000013","tags":["rv32"],"ignore":["rd","rs1","imm"]},
                {"mnemonic":"vadd","form":"R","stencil":"0x00000057","tags":["v"],"ignore":["rd","rs1","rs2","funct7"]}
            ]"#,
        )];
        let mut inclusions = HashSet::new();
        inclusions.insert("v".to_string());
        let mut dt = builder
            .configure_from_sources(&isa, &[], &inclusions, &HashSet::new())
            .unwrap();
        assert_eq!(dt.get_info(0x0000_0057).unwrap().mnemonic, "vadd");
        assert!(dt.get_info(0x0000_0013).is_err());
    }
}
