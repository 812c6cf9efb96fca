//! Exercises the direct/trace construction paths (spec §4.8): building an
//! `Instruction` from caller-supplied operands instead of bit-extraction,
//! resolving a trace record against a previously-decoded opcode, and
//! morphing an instruction in place.

use std::collections::HashSet;
use std::sync::Arc;

use mavis_catalog::{Builder, DirectInfo, Source};
use mavis_core::{OperandField, OperandInfo, OperandType, RegFile, TraceInfo};

fn build() -> mavis_catalog::Catalog {
    let builder = Builder::new();
    let isa = vec![Source {
        label: "isa.json".to_string(),
        contents: r#"[
            {"mnemonic":"addi","form":"I","stencil":"0x00000013","ignore":["rd","rs1","imm"],"sources":["rs1","imm"],"dests":["rd"]},
            {"mnemonic":"c.add","form":"CR","stencil":"0x9002","dests":["rd_rs1"],"sources":["rs2"]},
            {"pseudo":"nop_pseudo","form":"I"}
        ]"#
        .to_string(),
    }];
    builder
        .configure_from_sources(&isa, &[], &HashSet::new(), &HashSet::new())
        .expect("fixture catalog builds cleanly")
}

#[test]
fn make_inst_directly_builds_without_decoding_an_opcode() {
    let dt = build();
    let operands = OperandInfo {
        sources: vec![OperandField {
            field_id: "rs1".into(),
            operand_type: OperandType::Reg(RegFile::Integer),
            value: 3,
        }],
        dests: vec![],
        specials: vec![],
    };
    let direct = DirectInfo::new("addi", operands.clone());
    let inst = dt.make_inst_directly(&direct).unwrap();
    assert_eq!(inst.mnemonic, "addi");
    assert_eq!(inst.opcode, 0);
    assert_eq!(inst.operands, operands);
}

#[test]
fn make_inst_directly_resolves_pseudo_mnemonics() {
    let dt = build();
    let direct = DirectInfo::new("nop_pseudo", OperandInfo::default());
    let inst = dt.make_inst_directly(&direct).unwrap();
    assert_eq!(inst.mnemonic, "nop_pseudo");
}

#[test]
fn make_inst_directly_rejects_unknown_mnemonic() {
    let dt = build();
    let direct = DirectInfo::new("bogus", OperandInfo::default());
    assert!(dt.make_inst_directly(&direct).is_err());
}

#[test]
fn make_inst_from_trace_overrides_a_mismatched_decode() {
    let mut dt = build();
    // 0x9002 decodes to "c.add"; a trace record claiming the executed
    // instruction was actually "addi" must resolve to that leaf instead.
    let trace = TraceInfo {
        opcode: 0x9002,
        mnemonic: "addi".to_string(),
    };
    let inst = dt.make_inst_from_trace(&trace).unwrap();
    assert_eq!(inst.mnemonic, "addi");
    assert_eq!(inst.opcode, 0x9002);
}

#[test]
fn make_inst_from_trace_matching_mnemonic_is_a_plain_decode() {
    let mut dt = build();
    let trace = TraceInfo {
        opcode: 0x9002,
        mnemonic: "c.add".to_string(),
    };
    let inst = dt.make_inst_from_trace(&trace).unwrap();
    assert_eq!(inst.mnemonic, "c.add");
}

#[test]
fn morph_inst_rewrites_an_existing_instruction_in_place() {
    let dt = build();
    let inst_arc = dt
        .make_inst_directly(&DirectInfo::new("addi", OperandInfo::default()))
        .unwrap();
    let mut inst = Arc::try_unwrap(inst_arc).expect("sole owner of a freshly built instruction");

    dt.morph_inst(&mut inst, &DirectInfo::new("c.add", OperandInfo::default()))
        .unwrap();
    assert_eq!(inst.mnemonic, "c.add");
}
