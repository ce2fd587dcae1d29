//! Best-effort stack-effect analysis over a code section's byte stream.

use eof_opcodes::{DataPortion, Lookup, lookup};

/// Derived type-section metadata for a code section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackEffect {
    pub inputs: u8,
    pub outputs: u8,
    pub max_stack_height: u16,
}

/// Scan a code section once, front to back, tracking the stack height to
/// derive the section's inputs, outputs and maximum stack height.
///
/// Known limitation: relative jumps are treated as straight-line code, so a
/// `RJUMP`/`RJUMPI` that targets an earlier offset reports heights as if the
/// jump fell through. Callers that need exact values for looping sections
/// must state them explicitly.
///
/// An undefined opcode yields the all-zero result instead of an error:
/// malformed code must still serialize into a container, it just gets
/// degenerate metadata.
pub fn compute_stack_effect(code: &[u8]) -> StackEffect {
    let mut height: i64 = 0;
    let mut min_height: i64 = 0;
    let mut max_height: i64 = 0;

    let mut offset = 0;
    while offset < code.len() {
        let opcode = match lookup(code[offset]) {
            Lookup::Defined(opcode) => opcode,
            Lookup::Undefined(_) => return StackEffect::default(),
        };

        let immediate_len = match opcode.data_portion {
            DataPortion::Fixed(len) => len as usize,
            // The count byte may itself be truncated away; treat the
            // immediate as absent rather than reading out of bounds.
            DataPortion::JumpTable => match code.get(offset + 1) {
                Some(&count) => 1 + (count as usize + 1) * 2,
                None => 0,
            },
        };

        height -= opcode.popped_stack_items as i64;
        min_height = min_height.min(height);
        height += opcode.pushed_stack_items as i64;
        max_height = max_height.max(height);

        offset += 1 + immediate_len;
    }

    StackEffect {
        inputs: (-min_height).clamp(0, u8::MAX as i64) as u8,
        outputs: height.clamp(0, u8::MAX as i64) as u8,
        max_stack_height: max_height.clamp(0, u16::MAX as i64) as u16,
    }
}
