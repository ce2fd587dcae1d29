//! Stack-effect analysis tests.

use crate::{StackEffect, compute_stack_effect};
use alloy_primitives::hex;

fn effect(inputs: u8, outputs: u8, max_stack_height: u16) -> StackEffect {
    StackEffect { inputs, outputs, max_stack_height }
}

#[test]
fn empty_code_has_no_effect() {
    assert_eq!(compute_stack_effect(&[]), effect(0, 0, 0));
}

#[test]
fn pushes_raise_outputs_and_height() {
    // PUSH1 1, PUSH1 2
    assert_eq!(compute_stack_effect(&hex!("60016002")), effect(0, 2, 2));
}

#[test]
fn leading_pops_become_inputs() {
    // POP, POP
    assert_eq!(compute_stack_effect(&hex!("5050")), effect(2, 0, 0));
    // ADD consumes two and leaves one.
    assert_eq!(compute_stack_effect(&hex!("01")), effect(2, 0, 0));
}

#[test]
fn balanced_sequence() {
    // ADDRESS, POP, STOP
    assert_eq!(compute_stack_effect(&hex!("305000")), effect(0, 0, 1));
}

#[test]
fn immediates_are_not_decoded_as_opcodes() {
    // PUSH2 0x5050: the immediate bytes are POP if misread.
    assert_eq!(compute_stack_effect(&hex!("615050")), effect(0, 1, 1));
}

#[test]
fn unknown_opcode_yields_degenerate_result() {
    // 0x0c is unassigned; the analysis must not fail, only go to zero.
    assert_eq!(compute_stack_effect(&hex!("60010c")), effect(0, 0, 0));
}

#[test]
fn rjumpv_table_is_skipped() {
    // PUSH1 0, RJUMPV [+0], STOP: the jump table bytes are not opcodes.
    assert_eq!(compute_stack_effect(&hex!("6000e200000000")), effect(0, 0, 1));
}

#[test]
fn truncated_rjumpv_count_byte() {
    // The stream ends right at RJUMPV; the immediate is treated as absent.
    assert_eq!(compute_stack_effect(&hex!("6000e2")), effect(0, 0, 1));
}

#[test]
fn backward_jumps_are_treated_as_fall_through() {
    // PUSH1 1, POP, RJUMP -4 loops forever; the single-pass scan sees a
    // straight line and reports the fall-through heights.
    assert_eq!(compute_stack_effect(&hex!("6001 50 e0fffc")), effect(0, 0, 1));
}

#[test]
fn heights_saturate_at_field_width() {
    // 300 pushes exceed a one-byte outputs field; the result clamps.
    let code = hex!("6000").repeat(300);
    assert_eq!(compute_stack_effect(&code), effect(0, 255, 300));
}
