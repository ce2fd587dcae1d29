//! Section-level encoding tests.

use crate::{Container, EofError, NON_RETURNING, Section, SectionKind};
use alloy_primitives::hex;
use eof_bytecode::Bytecode;
use eof_opcodes::op;

#[test]
fn header_bytes_encode_kind_and_size() {
    let data = Section::data(hex!("aabbcc"));
    assert_eq!(data.header_bytes().unwrap(), hex!("040003"));

    let container = Section::raw_container(hex!("ef0001"));
    assert_eq!(container.header_bytes().unwrap(), hex!("030003"));

    // Unknown kinds are representable for negative tests.
    let bogus = Section::raw(SectionKind(0x09), hex!("00"));
    assert_eq!(bogus.header_bytes().unwrap(), hex!("090001"));
}

#[test]
fn code_section_has_no_standalone_header() {
    let code = Section::code(Bytecode::op(op::STOP));
    assert_eq!(code.header_bytes(), Err(EofError::CodeSectionRequiresGroupHeader));
}

#[test]
fn custom_size_may_undershoot_payload() {
    // Advisory header metadata, not a structural constraint.
    let section = Section::data(hex!("aabbcc")).with_custom_size(1);
    assert_eq!(section.size().unwrap(), 1);
    assert_eq!(section.body_bytes().unwrap().len(), 3);
    assert_eq!(section.header_bytes().unwrap(), hex!("040001"));
}

#[test]
fn oversized_payload_has_no_header_size() {
    let section = Section::data(vec![0u8; 0x1_0000]);
    assert_eq!(
        section.size(),
        Err(EofError::SectionTooLarge { kind: SectionKind::DATA, len: 0x1_0000 })
    );

    // A custom size sidesteps the check; only the derived size is bounded.
    let sized = Section::data(vec![0u8; 0x1_0000]).with_custom_size(0xffff);
    assert_eq!(sized.size().unwrap(), 0xffff);
}

#[test]
fn type_definition_defaults_to_non_returning() {
    let section = Section::code(Bytecode::op(op::STOP));
    assert_eq!(section.type_definition_bytes().unwrap(), hex!("00800000"));
}

#[test]
fn type_definition_with_explicit_metadata() {
    let section = Section::code(Bytecode::op(op::STOP))
        .with_code_inputs(2)
        .with_code_outputs(1)
        .with_max_stack_height(0x0203);
    assert_eq!(section.type_definition_bytes().unwrap(), hex!("02010203"));
}

#[test]
fn type_definition_from_stack_analysis() {
    // ADDRESS, POP, RETF: no inputs, no outputs, peak height one.
    let section = Section::raw_code(hex!("3050e4"))
        .with_auto_code_io()
        .with_auto_max_stack_height();
    assert_eq!(section.type_definition_bytes().unwrap(), hex!("00000001"));
}

#[test]
fn max_stack_height_defaults_from_bytecode() {
    let code = Bytecode::from_opcode(op::PUSH1, &[1]).unwrap()
        + Bytecode::from_opcode(op::PUSH1, &[2]).unwrap()
        + Bytecode::op(op::ADD)
        + Bytecode::op(op::STOP);
    let section = Section::code(code);
    assert_eq!(section.type_definition_bytes().unwrap(), hex!("00800002"));

    // Raw bytes carry no derived metadata.
    let raw = Section::raw_code(hex!("6001600201 00"));
    assert_eq!(raw.type_definition_bytes().unwrap(), hex!("00800000"));
}

#[test]
fn non_code_sections_have_no_type_entry() {
    assert_eq!(Section::data(hex!("aa")).type_definition_bytes().unwrap(), hex!(""));

    let forced = Section::data(hex!("aa")).with_force_type_listing().with_code_outputs(0);
    assert_eq!(forced.type_definition_bytes().unwrap(), hex!("00000000"));
}

#[test]
fn list_header_groups_code_sections() {
    let a = Section::code(Bytecode::op(op::STOP));
    let b = Section::code(Bytecode::op(op::ADDRESS) + Bytecode::op(op::POP));
    let header = Section::list_header(&[&a, &b]).unwrap();
    assert_eq!(header, hex!("02000200010002"));
}

#[test]
fn list_header_skips_flagged_sections() {
    let a = Section::code(Bytecode::op(op::STOP));
    let b = Section::code(Bytecode::op(op::STOP)).without_header_listing();
    assert_eq!(Section::list_header(&[&a, &b]).unwrap(), hex!("0200010001"));

    // A fully-skipped run contributes nothing, not an empty group.
    assert_eq!(Section::list_header(&[&b]).unwrap(), hex!(""));
}

#[test]
fn list_header_concatenates_other_kinds() {
    let a = Section::data(hex!("aa"));
    let b = Section::data(hex!("bbcc"));
    assert_eq!(Section::list_header(&[&a, &b]).unwrap(), hex!("040001040002"));
}

#[test]
fn nested_container_payload_serializes_lazily() {
    let inner = Container::code(Bytecode::op(op::STOP));
    let expected = inner.serialize().unwrap();
    let section = Section::container(inner);
    assert_eq!(section.body_bytes().unwrap(), expected);
    assert_eq!(section.size().unwrap(), expected.len() as u16);
}

#[test]
fn nested_container_self_check_propagates() {
    let inner =
        Container::code(Bytecode::op(op::STOP)).with_expected_bytecode(hex!("ff"));
    let outer = Container::new(vec![
        Section::code(Bytecode::op(op::STOP)),
        Section::container(inner),
    ]);
    assert!(matches!(outer.serialize(), Err(EofError::BytecodeMismatch { .. })));
}

#[test]
fn code_outputs_sentinel_is_exported() {
    assert_eq!(NON_RETURNING, 0x80);
    assert_eq!(SectionKind::TYPE.0, 0x01);
    assert_eq!(SectionKind::CODE.0, 0x02);
    assert_eq!(SectionKind::CONTAINER.0, 0x03);
    assert_eq!(SectionKind::DATA.0, 0x04);
}
