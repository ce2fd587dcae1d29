//! Strict disassembler for raw bytecode.
//!
//! Unlike the lenient stack-effect analysis over code sections, this decoder
//! exists for bit-exact recovery: any byte that does not map to a table
//! entry, or an immediate cut short by the end of the stream, is an error.

use alloy_primitives::hex;
use eof_opcodes::{DataPortion, Lookup, Opcode, lookup};
use std::fmt;

/// A decoded opcode together with its immediate bytes.
///
/// For `RJUMPV` the immediate includes the leading count byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: &'static Opcode,
    pub immediate: Vec<u8>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.immediate.is_empty() {
            f.write_str(self.opcode.mnemonic)
        } else {
            write!(f, "{} 0x{}", self.opcode.mnemonic, hex::encode(&self.immediate))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisassemblyError {
    /// A byte value with no table entry at the given offset.
    UnknownOpcode { byte: u8, offset: usize },
    /// The stream ends inside an opcode's immediate.
    TruncatedImmediate { mnemonic: &'static str, offset: usize },
}

impl fmt::Display for DisassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisassemblyError::UnknownOpcode { byte, offset } => {
                write!(f, "unknown opcode {byte:#04x} at offset {offset}")
            }
            DisassemblyError::TruncatedImmediate { mnemonic, offset } => {
                write!(f, "truncated immediate for {mnemonic} at offset {offset}")
            }
        }
    }
}

impl std::error::Error for DisassemblyError {}

/// Decode a raw byte stream into an opcode sequence.
pub fn disassemble(code: &[u8]) -> Result<Vec<Instruction>, DisassemblyError> {
    let mut instructions = Vec::new();
    let mut offset = 0;
    while offset < code.len() {
        let opcode = match lookup(code[offset]) {
            Lookup::Defined(opcode) => opcode,
            Lookup::Undefined(byte) => return Err(DisassemblyError::UnknownOpcode { byte, offset }),
        };
        let immediate_len = match opcode.data_portion {
            DataPortion::Fixed(len) => len as usize,
            DataPortion::JumpTable => match code.get(offset + 1) {
                Some(&count) => 1 + (count as usize + 1) * 2,
                None => {
                    return Err(DisassemblyError::TruncatedImmediate {
                        mnemonic: opcode.mnemonic,
                        offset,
                    });
                }
            },
        };
        let start = offset + 1;
        let end = start + immediate_len;
        if end > code.len() {
            return Err(DisassemblyError::TruncatedImmediate { mnemonic: opcode.mnemonic, offset });
        }
        instructions.push(Instruction { opcode, immediate: code[start..end].to_vec() });
        offset = end;
    }
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bytecode;
    use eof_opcodes::op;

    fn mnemonics(code: &[u8]) -> Vec<String> {
        disassemble(code).unwrap().iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn decodes_simple_sequence() {
        assert_eq!(
            mnemonics(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00]),
            ["PUSH1 0x01", "PUSH1 0x02", "ADD", "STOP"]
        );
    }

    #[test]
    fn round_trips_constructed_bytecode() {
        let code = Bytecode::from_opcode(op::PUSH2, &[0x1234]).unwrap()
            + Bytecode::op(op::POP)
            + Bytecode::from_opcode(op::RJUMPV, &[3, -2]).unwrap()
            + Bytecode::op(op::STOP);
        let decoded = disassemble(code.as_slice()).unwrap();
        let opcodes: Vec<_> = decoded.iter().map(|i| i.opcode.mnemonic).collect();
        assert_eq!(opcodes, ["PUSH2", "POP", "RJUMPV", "STOP"]);
        assert_eq!(decoded[2].immediate, [0x01, 0x00, 0x03, 0xff, 0xfe]);
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert_eq!(
            disassemble(&[0x60, 0x01, 0x0c]),
            Err(DisassemblyError::UnknownOpcode { byte: 0x0c, offset: 2 })
        );
    }

    #[test]
    fn rejects_truncated_immediates() {
        // PUSH2 with a single immediate byte.
        assert_eq!(
            disassemble(&[0x61, 0x01]),
            Err(DisassemblyError::TruncatedImmediate { mnemonic: "PUSH2", offset: 0 })
        );
        // RJUMPV with no count byte.
        assert_eq!(
            disassemble(&[0x00, 0xe2]),
            Err(DisassemblyError::TruncatedImmediate { mnemonic: "RJUMPV", offset: 1 })
        );
        // RJUMPV whose table runs past the end.
        assert_eq!(
            disassemble(&[0xe2, 0x01, 0x00, 0x00]),
            Err(DisassemblyError::TruncatedImmediate { mnemonic: "RJUMPV", offset: 0 })
        );
    }
}
