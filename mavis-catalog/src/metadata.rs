//! Parses one catalog JSON object into a `mavis_core::InstMetaData`
//! (spec §4.3): the recognized-keys table, with everything else ignored.

use std::collections::HashSet;

use serde_json::Value;

use mavis_core::{InstMetaData, OperandType};

use crate::error::{CatalogError, Result};
use crate::json::{as_string, as_string_list};

/// Builds `InstMetaData` from a catalog entry already known to carry a
/// `form`. `mnemonic` is passed separately since overlay/pseudo entries
/// derive it differently than a normal instruction entry does.
pub fn parse_meta(mnemonic: &str, form: &'static str, entry: &Value) -> InstMetaData {
    let mut meta = InstMetaData::new(mnemonic, form);
    meta.sources = as_string_list(entry.get("sources").unwrap_or(&Value::Null));
    meta.dests = as_string_list(entry.get("dests").unwrap_or(&Value::Null));
    meta.specials = as_string_list(entry.get("specials").unwrap_or(&Value::Null));
    meta.tags = as_string_list(entry.get("tags").unwrap_or(&Value::Null))
        .into_iter()
        .collect::<HashSet<_>>();
    meta.fixed = as_string_list(entry.get("fixed").unwrap_or(&Value::Null));
    meta.ignore = as_string_list(entry.get("ignore").unwrap_or(&Value::Null));
    meta.operand_types = parse_operand_types(entry);
    meta.expand = as_string(entry, "expand");
    meta.data = entry.get("data").map(|v| v.to_string());
    meta
}

/// Reads an optional `"operand_types"` object (field name -> type key,
/// same vocabulary as `OperandType::from_key`) into the override map
/// consulted by `FormGenericExtractor`.
pub fn parse_operand_types(entry: &Value) -> std::collections::HashMap<String, OperandType> {
    let mut map = std::collections::HashMap::new();
    if let Some(obj) = entry.get("operand_types").and_then(Value::as_object) {
        for (field, key) in obj {
            if let Some(key) = key.as_str() {
                if let Some(ty) = OperandType::from_key(key) {
                    map.insert(field.clone(), ty);
                }
            }
        }
    }
    map
}

pub fn mnemonic_of(file: &str, entry: &Value, stencil: Option<String>) -> Result<String> {
    as_string(entry, "mnemonic").ok_or_else(|| CatalogError::MissingMnemonic {
        file: file.to_string(),
        stencil,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_recognized_keys_and_ignores_the_rest() {
        let entry = json!({
            "mnemonic": "addi",
            "form": "I",
            "sources": ["rs1", "imm"],
            "dests": ["rd"],
            "tags": ["rv32", "rv64"],
            "unrelated_future_key": 123,
        });
        let meta = parse_meta("addi", "I", &entry);
        assert_eq!(meta.sources, vec!["rs1".to_string(), "imm".to_string()]);
        assert_eq!(meta.dests, vec!["rd".to_string()]);
        assert!(meta.tags.contains("rv64"));
    }

    #[test]
    fn operand_type_overrides_parse_from_map() {
        let entry = json!({"operand_types": {"rd": "int", "imm": "imm"}});
        let map = parse_operand_types(&entry);
        assert_eq!(map.get("rd"), Some(&OperandType::Reg(mavis_core::RegFile::Integer)));
        assert_eq!(map.get("imm"), Some(&OperandType::Immediate));
    }
}
