//! Closed enumerations for operand classification (design note: "Global
//! type enumerations... Model as closed enums with a name<->value lookup
//! table").

use std::fmt;

/// Register file an operand field indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegFile {
    Integer,
    Float,
    Vector,
}

/// The kind of value an operand field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    Reg(RegFile),
    Immediate,
    Special,
}

impl OperandType {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "w" | "word" | "int" => Some(OperandType::Reg(RegFile::Integer)),
            "f" | "float" => Some(OperandType::Reg(RegFile::Float)),
            "v" | "vector" => Some(OperandType::Reg(RegFile::Vector)),
            "imm" | "immediate" => Some(OperandType::Immediate),
            "special" => Some(OperandType::Special),
            _ => None,
        }
    }
}

impl fmt::Display for OperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandType::Reg(RegFile::Integer) => write!(f, "int"),
            OperandType::Reg(RegFile::Float) => write!(f, "float"),
            OperandType::Reg(RegFile::Vector) => write!(f, "vector"),
            OperandType::Immediate => write!(f, "imm"),
            OperandType::Special => write!(f, "special"),
        }
    }
}

/// A single decoded operand: which field it came from, its declared type,
/// and the raw extracted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandField {
    pub field_id: String,
    pub operand_type: OperandType,
    pub value: u64,
}

/// Output of an `Extractor`: source/dest operand lists plus a name->value
/// map of special fields (rounding modes, conditions, and the like).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperandInfo {
    pub sources: Vec<OperandField>,
    pub dests: Vec<OperandField>,
    pub specials: Vec<(String, u64)>,
}

impl OperandInfo {
    pub fn special(&self, name: &str) -> Option<u64> {
        self.specials
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}
