//! Built-in instruction forms: named, ordered field layouts.

use std::collections::HashMap;

use crate::field::Field;

/// A named, ordered field layout for one encoding shape.
///
/// `descent` lists the fields consulted by the dispatch trie, in
/// traversal order (the first is the form's *selector*, per spec
/// terminology). `operands` lists every field an extractor may read,
/// which typically includes register and immediate fields that never
/// appear in `descent` because their value doesn't change which
/// instruction an opcode decodes to.
#[derive(Debug, Clone)]
pub struct Form {
    name: &'static str,
    descent: Vec<Field>,
    operands: HashMap<&'static str, Field>,
}

impl Form {
    fn new(name: &'static str, descent: Vec<Field>, extra_operands: Vec<Field>) -> Self {
        let mut operands = HashMap::new();
        for f in descent.iter().chain(extra_operands.iter()) {
            operands.insert(f.name(), *f);
        }
        Self {
            name,
            descent,
            operands,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields walked by the dispatch trie, in order. Non-empty by
    /// construction (`Form::new` is only ever called with at least one
    /// descent field, all built-in).
    pub fn descent_fields(&self) -> &[Field] {
        &self.descent
    }

    /// The distinguished first-level dispatch field.
    pub fn selector(&self) -> &Field {
        &self.descent[0]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.operands.get(name)
    }
}

/// Static table of named forms, built-in constants of the ISA family.
/// Forms are never user-defined at runtime; a JSON `"form"` key names one
/// of these.
#[derive(Debug)]
pub struct FormRegistry {
    forms: HashMap<&'static str, Form>,
}

impl Default for FormRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormRegistry {
    pub fn new() -> Self {
        let opcode = Field::new("opcode", 0, 6);
        let funct3 = Field::new("funct3", 12, 14);
        let funct7 = Field::new("funct7", 25, 31);
        let rd = Field::new("rd", 7, 11);
        let rs1 = Field::new("rs1", 15, 19);
        let rs2 = Field::new("rs2", 20, 24);
        let imm_i = Field::new("imm", 20, 31);
        let imm_s_lo = Field::new("imm_lo", 7, 11);
        let imm_s_hi = Field::new("imm_hi", 25, 31);
        let imm_u = Field::new("imm", 12, 31);

        let c_op = Field::new("c_op", 0, 1);
        let c_funct4 = Field::new("funct4", 12, 15);
        let c_funct3 = Field::new("c_funct3", 13, 15);
        let c_rd_rs1 = Field::new("rd_rs1", 7, 11);
        let c_rs2 = Field::new("rs2", 2, 6);
        let c_rd_rs1_short = Field::new("rd_rs1p", 7, 9);
        let c_imm = Field::new("imm", 2, 6);
        let c_imm_hi = Field::new("imm_hi", 12, 12);

        let mut forms = HashMap::new();
        forms.insert(
            "R",
            Form::new(
                "R",
                vec![opcode, funct3, funct7],
                vec![rd, rs1, rs2],
            ),
        );
        forms.insert(
            "I",
            Form::new("I", vec![opcode, funct3], vec![rd, rs1, imm_i]),
        );
        forms.insert(
            "S",
            Form::new(
                "S",
                vec![opcode, funct3],
                vec![rs1, rs2, imm_s_lo, imm_s_hi],
            ),
        );
        forms.insert(
            "B",
            Form::new(
                "B",
                vec![opcode, funct3],
                vec![rs1, rs2, imm_s_lo, imm_s_hi],
            ),
        );
        forms.insert("U", Form::new("U", vec![opcode], vec![rd, imm_u]));
        forms.insert("J", Form::new("J", vec![opcode], vec![rd, imm_u]));

        // Compressed (16-bit) forms. `c_op` is the quadrant, already
        // narrowed by the root MatchList predicate that selects the
        // compressed encoding class, but is kept in the descent list so a
        // single compressed subtree can hold all three quadrants.
        forms.insert(
            "CR",
            Form::new("CR", vec![c_op, c_funct4, c_rd_rs1], vec![c_rs2]),
        );
        forms.insert(
            "CI",
            Form::new(
                "CI",
                vec![c_op, c_funct3, c_rd_rs1],
                vec![c_imm, c_imm_hi],
            ),
        );
        forms.insert(
            "CIW",
            Form::new("CIW", vec![c_op, c_funct3], vec![c_rd_rs1_short, c_imm]),
        );
        forms.insert(
            "CA",
            Form::new(
                "CA",
                vec![c_op, c_funct3, c_rd_rs1_short],
                vec![c_rs2],
            ),
        );

        Self { forms }
    }

    pub fn lookup(&self, name: &str) -> Option<&Form> {
        self.forms.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_form() {
        let reg = FormRegistry::new();
        let form = reg.lookup("I").expect("I form is built in");
        assert_eq!(form.name(), "I");
        assert_eq!(form.descent_fields().len(), 2);
        assert_eq!(form.selector().name(), "opcode");
    }

    #[test]
    fn lookup_unknown_form_is_none() {
        let reg = FormRegistry::new();
        assert!(reg.lookup("ZZZ").is_none());
    }

    #[test]
    fn operand_field_accessible_even_when_not_in_descent() {
        let reg = FormRegistry::new();
        let form = reg.lookup("I").unwrap();
        assert!(form.field("imm").is_some());
        assert!(form.descent_fields().iter().all(|f| f.name() != "imm"));
    }
}
