//! EVM bytecode as a composable value type.
//!
//! A [`Bytecode`] wraps a raw byte sequence together with derived
//! stack-height metadata: how many items it pops and pushes net, and the
//! minimum/maximum stack height reached relative to its entry height.
//! Values are built from single opcodes via [`Bytecode::from_opcode`] and
//! composed by concatenation and repetition, with the metadata recomputed
//! compositionally at every step.

mod disasm;

pub use disasm::{DisassemblyError, Instruction, disassemble};

use alloy_primitives::{B256, Bytes, hex, keccak256};
use eof_opcodes::{DataPortion, Opcode};
use std::{
    cmp::max,
    fmt,
    iter::Sum,
    ops::{Add, Mul},
};

/// Errors from opcode-level bytecode construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytecodeError {
    /// Operand count does not match the opcode's data portion.
    InvalidOperandCount { mnemonic: &'static str, expected: usize, got: usize },
    /// Operand value does not fit the opcode's immediate width.
    OperandOutOfRange { mnemonic: &'static str, value: i64, width: u32 },
}

impl fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeError::InvalidOperandCount { mnemonic, expected, got } => {
                write!(f, "{mnemonic} takes {expected} operand(s), got {got}")
            }
            BytecodeError::OperandOutOfRange { mnemonic, value, width } => {
                write!(f, "operand {value} does not fit the {width}-byte immediate of {mnemonic}")
            }
        }
    }
}

impl std::error::Error for BytecodeError {}

pub type Result<T> = std::result::Result<T, BytecodeError>;

/// A raw byte sequence with derived stack-height metadata.
///
/// All heights are relative to the stack height at the start of the
/// sequence. `min_stack_height` is the number of items the sequence needs on
/// entry; `max_stack_height` is the highest height it reaches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytecode {
    raw: Vec<u8>,
    pub popped_stack_items: u32,
    pub pushed_stack_items: u32,
    pub min_stack_height: u32,
    pub max_stack_height: u32,
    pub terminating: bool,
    pub name: String,
}

impl Bytecode {
    /// The empty sequence, the neutral element of concatenation.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap raw bytes with no stack metadata.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        Self { raw: bytes.into(), ..Self::default() }
    }

    /// Single opcode with a caller-encoded immediate. No arity or width
    /// checks; this is the escape hatch for deliberately malformed
    /// sequences (truncated or oversized immediates).
    pub fn op_with_immediate(op: Opcode, immediate: &[u8]) -> Self {
        let mut raw = Vec::with_capacity(1 + immediate.len());
        raw.push(op.byte_value);
        raw.extend_from_slice(immediate);
        Self {
            raw,
            popped_stack_items: op.popped_stack_items,
            pushed_stack_items: op.pushed_stack_items,
            min_stack_height: op.popped_stack_items,
            max_stack_height: max(op.popped_stack_items, op.pushed_stack_items),
            terminating: op.terminating,
            name: op.mnemonic.to_string(),
        }
    }

    /// Single opcode with no immediate.
    pub fn op(op: Opcode) -> Self {
        Self::op_with_immediate(op, &[])
    }

    /// Single opcode with validated operands.
    ///
    /// Opcodes with a fixed data portion of width `L > 0` take exactly one
    /// operand, encoded two's-complement big-endian across the whole
    /// portion. `RJUMPV` takes 1..=256 jump offsets; the wire format cannot
    /// express an empty jump table.
    pub fn from_opcode(op: Opcode, operands: &[i64]) -> Result<Self> {
        let immediate = match op.data_portion {
            DataPortion::Fixed(0) => {
                if !operands.is_empty() {
                    return Err(BytecodeError::InvalidOperandCount {
                        mnemonic: op.mnemonic,
                        expected: 0,
                        got: operands.len(),
                    });
                }
                Vec::new()
            }
            DataPortion::Fixed(width) => {
                let [value] = operands else {
                    return Err(BytecodeError::InvalidOperandCount {
                        mnemonic: op.mnemonic,
                        expected: 1,
                        got: operands.len(),
                    });
                };
                encode_immediate(op, *value, width)?
            }
            DataPortion::JumpTable => {
                if operands.is_empty() || operands.len() > 256 {
                    return Err(BytecodeError::InvalidOperandCount {
                        mnemonic: op.mnemonic,
                        expected: 256,
                        got: operands.len(),
                    });
                }
                let mut immediate = Vec::with_capacity(1 + operands.len() * 2);
                immediate.push((operands.len() - 1) as u8);
                for offset in operands {
                    immediate.extend_from_slice(&encode_immediate(op, *offset, 2)?);
                }
                immediate
            }
        };
        Ok(Self::op_with_immediate(op, &immediate))
    }

    /// Override the stack-height bounds, e.g. for a hand-assembled sequence
    /// with internal branches whose true bounds the concatenation formulas
    /// cannot see.
    pub fn with_stack_bounds(mut self, min_stack_height: u32, max_stack_height: u32) -> Self {
        self.min_stack_height = min_stack_height;
        self.max_stack_height = max_stack_height;
        self
    }

    /// Override the net pop/push counts.
    pub fn with_stack_effect(mut self, popped: u32, pushed: u32) -> Self {
        self.popped_stack_items = popped;
        self.pushed_stack_items = pushed;
        self
    }

    pub fn with_terminating(mut self, terminating: bool) -> Self {
        self.terminating = terminating;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.raw
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.raw.clone())
    }

    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.raw)
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Keccak-256 hash of the raw bytes.
    pub fn keccak256(&self) -> B256 {
        keccak256(&self.raw)
    }

    /// Concatenate two sequences, composing the stack metadata.
    ///
    /// Concatenation with the neutral element returns the other operand
    /// unchanged, so folds over sequences need no seed special case.
    pub fn concat(&self, other: &Bytecode) -> Bytecode {
        if *self == Bytecode::default() {
            return other.clone();
        }
        if *other == Bytecode::default() {
            return self.clone();
        }

        let a_pop = self.popped_stack_items as i64;
        let a_push = self.pushed_stack_items as i64;
        let a_min = self.min_stack_height as i64;
        let a_max = self.max_stack_height as i64;
        let b_pop = other.popped_stack_items as i64;
        let b_push = other.pushed_stack_items as i64;
        let b_min = other.min_stack_height as i64;
        let b_max = other.max_stack_height as i64;

        let out_pop = max(0, a_pop + (b_pop - a_push));
        let out_push = max(0, a_push + b_push - b_pop);

        // Height at the seam, relative to this sequence's entry height.
        let a_out = a_min - a_pop + a_push;
        let out_min = if a_out >= b_min { a_min } else { (b_min - a_out) + a_min };
        let out_max = max(a_max + max(0, b_min - a_out), b_max + max(0, a_out - b_min));

        let mut raw = Vec::with_capacity(self.raw.len() + other.raw.len());
        raw.extend_from_slice(&self.raw);
        raw.extend_from_slice(&other.raw);

        Bytecode {
            raw,
            popped_stack_items: out_pop as u32,
            pushed_stack_items: out_push as u32,
            min_stack_height: out_min as u32,
            max_stack_height: out_max as u32,
            terminating: other.terminating,
            name: String::new(),
        }
    }

    /// `n`-fold self-concatenation; `n == 0` yields the empty sequence.
    pub fn repeat(&self, n: usize) -> Bytecode {
        (0..n).fold(Bytecode::default(), |acc, _| acc.concat(self))
    }
}

fn encode_immediate(op: Opcode, value: i64, width: u32) -> Result<Vec<u8>> {
    let width = width as usize;
    if width < 8 {
        let bits = width as u32 * 8;
        let fits_unsigned = value >= 0 && (value >> bits) == 0;
        let fits_signed = value < 0 && (value >> (bits - 1)) == -1;
        if !fits_unsigned && !fits_signed {
            return Err(BytecodeError::OperandOutOfRange {
                mnemonic: op.mnemonic,
                value,
                width: width as u32,
            });
        }
    }
    let be = value.to_be_bytes();
    let sign = if value < 0 { 0xff } else { 0x00 };
    let mut out = vec![sign; width.saturating_sub(8)];
    out.extend_from_slice(&be[8usize.saturating_sub(width)..]);
    Ok(out)
}

impl Add for Bytecode {
    type Output = Bytecode;

    fn add(self, rhs: Bytecode) -> Bytecode {
        self.concat(&rhs)
    }
}

impl Mul<usize> for Bytecode {
    type Output = Bytecode;

    fn mul(self, n: usize) -> Bytecode {
        self.repeat(n)
    }
}

impl Sum for Bytecode {
    fn sum<I: Iterator<Item = Bytecode>>(iter: I) -> Self {
        iter.fold(Bytecode::default(), Add::add)
    }
}

impl From<Bytecode> for Bytes {
    fn from(code: Bytecode) -> Bytes {
        code.into_bytes()
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(&hex::encode_prefixed(&self.raw))
        } else {
            f.write_str(&self.name)
        }
    }
}
