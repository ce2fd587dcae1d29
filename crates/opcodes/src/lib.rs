//! Static EVM opcode table with stack-effect metadata.
//!
//! Every defined opcode carries its byte value, the number of stack items it
//! pops and pushes, the width of its immediate data portion, and whether it
//! terminates execution of the current code section. The table covers the
//! legacy opcode space as well as the EOF-only instructions (relative jumps,
//! `CALLF`/`RETF`/`JUMPF`, data-section access, `EOFCREATE`/`RETURNCONTRACT`
//! and the `EXT*CALL` family).

use std::{collections::HashMap, fmt, sync::OnceLock};

/// Immediate data carried after an opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataPortion {
    /// Fixed-width immediate; zero for the vast majority of opcodes.
    Fixed(u32),
    /// `RJUMPV`: a count byte `n` followed by `n + 1` two-byte jump offsets.
    JumpTable,
}

impl DataPortion {
    pub const NONE: DataPortion = DataPortion::Fixed(0);

    /// The immediate width when it is statically known.
    pub fn fixed_len(self) -> Option<u32> {
        match self {
            DataPortion::Fixed(len) => Some(len),
            DataPortion::JumpTable => None,
        }
    }
}

/// Metadata for a single defined opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub byte_value: u8,
    pub popped_stack_items: u32,
    pub pushed_stack_items: u32,
    pub data_portion: DataPortion,
    pub terminating: bool,
}

impl Opcode {
    const fn new(mnemonic: &'static str, byte_value: u8, pops: u32, pushes: u32) -> Self {
        Self {
            mnemonic,
            byte_value,
            popped_stack_items: pops,
            pushed_stack_items: pushes,
            data_portion: DataPortion::NONE,
            terminating: false,
        }
    }

    const fn with_data(mut self, len: u32) -> Self {
        self.data_portion = DataPortion::Fixed(len);
        self
    }

    const fn with_jump_table(mut self) -> Self {
        self.data_portion = DataPortion::JumpTable;
        self
    }

    const fn terminating(mut self) -> Self {
        self.terminating = true;
        self
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic)
    }
}

// Declares the opcode constants and collects them into `op::ALL` in one go so
// the constant list and the lookup tables cannot drift apart.
macro_rules! opcode_table {
    ($($name:ident = $def:expr;)*) => {
        /// Opcode constants, one per defined byte value.
        pub mod op {
            use super::Opcode;

            $(pub const $name: Opcode = $def;)*

            /// Every defined opcode, in byte-value order.
            pub static ALL: &[Opcode] = &[$($name),*];
        }
    };
}

opcode_table! {
    STOP = Opcode::new("STOP", 0x00, 0, 0).terminating();
    ADD = Opcode::new("ADD", 0x01, 2, 1);
    MUL = Opcode::new("MUL", 0x02, 2, 1);
    SUB = Opcode::new("SUB", 0x03, 2, 1);
    DIV = Opcode::new("DIV", 0x04, 2, 1);
    SDIV = Opcode::new("SDIV", 0x05, 2, 1);
    MOD = Opcode::new("MOD", 0x06, 2, 1);
    SMOD = Opcode::new("SMOD", 0x07, 2, 1);
    ADDMOD = Opcode::new("ADDMOD", 0x08, 3, 1);
    MULMOD = Opcode::new("MULMOD", 0x09, 3, 1);
    EXP = Opcode::new("EXP", 0x0a, 2, 1);
    SIGNEXTEND = Opcode::new("SIGNEXTEND", 0x0b, 2, 1);

    LT = Opcode::new("LT", 0x10, 2, 1);
    GT = Opcode::new("GT", 0x11, 2, 1);
    SLT = Opcode::new("SLT", 0x12, 2, 1);
    SGT = Opcode::new("SGT", 0x13, 2, 1);
    EQ = Opcode::new("EQ", 0x14, 2, 1);
    ISZERO = Opcode::new("ISZERO", 0x15, 1, 1);
    AND = Opcode::new("AND", 0x16, 2, 1);
    OR = Opcode::new("OR", 0x17, 2, 1);
    XOR = Opcode::new("XOR", 0x18, 2, 1);
    NOT = Opcode::new("NOT", 0x19, 1, 1);
    BYTE = Opcode::new("BYTE", 0x1a, 2, 1);
    SHL = Opcode::new("SHL", 0x1b, 2, 1);
    SHR = Opcode::new("SHR", 0x1c, 2, 1);
    SAR = Opcode::new("SAR", 0x1d, 2, 1);

    KECCAK256 = Opcode::new("KECCAK256", 0x20, 2, 1);

    ADDRESS = Opcode::new("ADDRESS", 0x30, 0, 1);
    BALANCE = Opcode::new("BALANCE", 0x31, 1, 1);
    ORIGIN = Opcode::new("ORIGIN", 0x32, 0, 1);
    CALLER = Opcode::new("CALLER", 0x33, 0, 1);
    CALLVALUE = Opcode::new("CALLVALUE", 0x34, 0, 1);
    CALLDATALOAD = Opcode::new("CALLDATALOAD", 0x35, 1, 1);
    CALLDATASIZE = Opcode::new("CALLDATASIZE", 0x36, 0, 1);
    CALLDATACOPY = Opcode::new("CALLDATACOPY", 0x37, 3, 0);
    CODESIZE = Opcode::new("CODESIZE", 0x38, 0, 1);
    CODECOPY = Opcode::new("CODECOPY", 0x39, 3, 0);
    GASPRICE = Opcode::new("GASPRICE", 0x3a, 0, 1);
    EXTCODESIZE = Opcode::new("EXTCODESIZE", 0x3b, 1, 1);
    EXTCODECOPY = Opcode::new("EXTCODECOPY", 0x3c, 4, 0);
    RETURNDATASIZE = Opcode::new("RETURNDATASIZE", 0x3d, 0, 1);
    RETURNDATACOPY = Opcode::new("RETURNDATACOPY", 0x3e, 3, 0);
    EXTCODEHASH = Opcode::new("EXTCODEHASH", 0x3f, 1, 1);

    BLOCKHASH = Opcode::new("BLOCKHASH", 0x40, 1, 1);
    COINBASE = Opcode::new("COINBASE", 0x41, 0, 1);
    TIMESTAMP = Opcode::new("TIMESTAMP", 0x42, 0, 1);
    NUMBER = Opcode::new("NUMBER", 0x43, 0, 1);
    PREVRANDAO = Opcode::new("PREVRANDAO", 0x44, 0, 1);
    GASLIMIT = Opcode::new("GASLIMIT", 0x45, 0, 1);
    CHAINID = Opcode::new("CHAINID", 0x46, 0, 1);
    SELFBALANCE = Opcode::new("SELFBALANCE", 0x47, 0, 1);
    BASEFEE = Opcode::new("BASEFEE", 0x48, 0, 1);
    BLOBHASH = Opcode::new("BLOBHASH", 0x49, 1, 1);
    BLOBBASEFEE = Opcode::new("BLOBBASEFEE", 0x4a, 0, 1);

    POP = Opcode::new("POP", 0x50, 1, 0);
    MLOAD = Opcode::new("MLOAD", 0x51, 1, 1);
    MSTORE = Opcode::new("MSTORE", 0x52, 2, 0);
    MSTORE8 = Opcode::new("MSTORE8", 0x53, 2, 0);
    SLOAD = Opcode::new("SLOAD", 0x54, 1, 1);
    SSTORE = Opcode::new("SSTORE", 0x55, 2, 0);
    JUMP = Opcode::new("JUMP", 0x56, 1, 0);
    JUMPI = Opcode::new("JUMPI", 0x57, 2, 0);
    PC = Opcode::new("PC", 0x58, 0, 1);
    MSIZE = Opcode::new("MSIZE", 0x59, 0, 1);
    GAS = Opcode::new("GAS", 0x5a, 0, 1);
    JUMPDEST = Opcode::new("JUMPDEST", 0x5b, 0, 0);
    TLOAD = Opcode::new("TLOAD", 0x5c, 1, 1);
    TSTORE = Opcode::new("TSTORE", 0x5d, 2, 0);
    MCOPY = Opcode::new("MCOPY", 0x5e, 3, 0);

    PUSH0 = Opcode::new("PUSH0", 0x5f, 0, 1);
    PUSH1 = Opcode::new("PUSH1", 0x60, 0, 1).with_data(1);
    PUSH2 = Opcode::new("PUSH2", 0x61, 0, 1).with_data(2);
    PUSH3 = Opcode::new("PUSH3", 0x62, 0, 1).with_data(3);
    PUSH4 = Opcode::new("PUSH4", 0x63, 0, 1).with_data(4);
    PUSH5 = Opcode::new("PUSH5", 0x64, 0, 1).with_data(5);
    PUSH6 = Opcode::new("PUSH6", 0x65, 0, 1).with_data(6);
    PUSH7 = Opcode::new("PUSH7", 0x66, 0, 1).with_data(7);
    PUSH8 = Opcode::new("PUSH8", 0x67, 0, 1).with_data(8);
    PUSH9 = Opcode::new("PUSH9", 0x68, 0, 1).with_data(9);
    PUSH10 = Opcode::new("PUSH10", 0x69, 0, 1).with_data(10);
    PUSH11 = Opcode::new("PUSH11", 0x6a, 0, 1).with_data(11);
    PUSH12 = Opcode::new("PUSH12", 0x6b, 0, 1).with_data(12);
    PUSH13 = Opcode::new("PUSH13", 0x6c, 0, 1).with_data(13);
    PUSH14 = Opcode::new("PUSH14", 0x6d, 0, 1).with_data(14);
    PUSH15 = Opcode::new("PUSH15", 0x6e, 0, 1).with_data(15);
    PUSH16 = Opcode::new("PUSH16", 0x6f, 0, 1).with_data(16);
    PUSH17 = Opcode::new("PUSH17", 0x70, 0, 1).with_data(17);
    PUSH18 = Opcode::new("PUSH18", 0x71, 0, 1).with_data(18);
    PUSH19 = Opcode::new("PUSH19", 0x72, 0, 1).with_data(19);
    PUSH20 = Opcode::new("PUSH20", 0x73, 0, 1).with_data(20);
    PUSH21 = Opcode::new("PUSH21", 0x74, 0, 1).with_data(21);
    PUSH22 = Opcode::new("PUSH22", 0x75, 0, 1).with_data(22);
    PUSH23 = Opcode::new("PUSH23", 0x76, 0, 1).with_data(23);
    PUSH24 = Opcode::new("PUSH24", 0x77, 0, 1).with_data(24);
    PUSH25 = Opcode::new("PUSH25", 0x78, 0, 1).with_data(25);
    PUSH26 = Opcode::new("PUSH26", 0x79, 0, 1).with_data(26);
    PUSH27 = Opcode::new("PUSH27", 0x7a, 0, 1).with_data(27);
    PUSH28 = Opcode::new("PUSH28", 0x7b, 0, 1).with_data(28);
    PUSH29 = Opcode::new("PUSH29", 0x7c, 0, 1).with_data(29);
    PUSH30 = Opcode::new("PUSH30", 0x7d, 0, 1).with_data(30);
    PUSH31 = Opcode::new("PUSH31", 0x7e, 0, 1).with_data(31);
    PUSH32 = Opcode::new("PUSH32", 0x7f, 0, 1).with_data(32);

    DUP1 = Opcode::new("DUP1", 0x80, 1, 2);
    DUP2 = Opcode::new("DUP2", 0x81, 2, 3);
    DUP3 = Opcode::new("DUP3", 0x82, 3, 4);
    DUP4 = Opcode::new("DUP4", 0x83, 4, 5);
    DUP5 = Opcode::new("DUP5", 0x84, 5, 6);
    DUP6 = Opcode::new("DUP6", 0x85, 6, 7);
    DUP7 = Opcode::new("DUP7", 0x86, 7, 8);
    DUP8 = Opcode::new("DUP8", 0x87, 8, 9);
    DUP9 = Opcode::new("DUP9", 0x88, 9, 10);
    DUP10 = Opcode::new("DUP10", 0x89, 10, 11);
    DUP11 = Opcode::new("DUP11", 0x8a, 11, 12);
    DUP12 = Opcode::new("DUP12", 0x8b, 12, 13);
    DUP13 = Opcode::new("DUP13", 0x8c, 13, 14);
    DUP14 = Opcode::new("DUP14", 0x8d, 14, 15);
    DUP15 = Opcode::new("DUP15", 0x8e, 15, 16);
    DUP16 = Opcode::new("DUP16", 0x8f, 16, 17);

    SWAP1 = Opcode::new("SWAP1", 0x90, 2, 2);
    SWAP2 = Opcode::new("SWAP2", 0x91, 3, 3);
    SWAP3 = Opcode::new("SWAP3", 0x92, 4, 4);
    SWAP4 = Opcode::new("SWAP4", 0x93, 5, 5);
    SWAP5 = Opcode::new("SWAP5", 0x94, 6, 6);
    SWAP6 = Opcode::new("SWAP6", 0x95, 7, 7);
    SWAP7 = Opcode::new("SWAP7", 0x96, 8, 8);
    SWAP8 = Opcode::new("SWAP8", 0x97, 9, 9);
    SWAP9 = Opcode::new("SWAP9", 0x98, 10, 10);
    SWAP10 = Opcode::new("SWAP10", 0x99, 11, 11);
    SWAP11 = Opcode::new("SWAP11", 0x9a, 12, 12);
    SWAP12 = Opcode::new("SWAP12", 0x9b, 13, 13);
    SWAP13 = Opcode::new("SWAP13", 0x9c, 14, 14);
    SWAP14 = Opcode::new("SWAP14", 0x9d, 15, 15);
    SWAP15 = Opcode::new("SWAP15", 0x9e, 16, 16);
    SWAP16 = Opcode::new("SWAP16", 0x9f, 17, 17);

    LOG0 = Opcode::new("LOG0", 0xa0, 2, 0);
    LOG1 = Opcode::new("LOG1", 0xa1, 3, 0);
    LOG2 = Opcode::new("LOG2", 0xa2, 4, 0);
    LOG3 = Opcode::new("LOG3", 0xa3, 5, 0);
    LOG4 = Opcode::new("LOG4", 0xa4, 6, 0);

    DATALOAD = Opcode::new("DATALOAD", 0xd0, 1, 1);
    DATALOADN = Opcode::new("DATALOADN", 0xd1, 0, 1).with_data(2);
    DATASIZE = Opcode::new("DATASIZE", 0xd2, 0, 1);
    DATACOPY = Opcode::new("DATACOPY", 0xd3, 3, 0);

    RJUMP = Opcode::new("RJUMP", 0xe0, 0, 0).with_data(2);
    RJUMPI = Opcode::new("RJUMPI", 0xe1, 1, 0).with_data(2);
    RJUMPV = Opcode::new("RJUMPV", 0xe2, 1, 0).with_jump_table();
    CALLF = Opcode::new("CALLF", 0xe3, 0, 0).with_data(2);
    RETF = Opcode::new("RETF", 0xe4, 0, 0).terminating();
    JUMPF = Opcode::new("JUMPF", 0xe5, 0, 0).with_data(2).terminating();
    DUPN = Opcode::new("DUPN", 0xe6, 0, 1).with_data(1);
    SWAPN = Opcode::new("SWAPN", 0xe7, 0, 0).with_data(1);
    EXCHANGE = Opcode::new("EXCHANGE", 0xe8, 0, 0).with_data(1);
    EOFCREATE = Opcode::new("EOFCREATE", 0xec, 4, 1).with_data(1);
    RETURNCONTRACT = Opcode::new("RETURNCONTRACT", 0xee, 2, 0).with_data(1).terminating();

    CREATE = Opcode::new("CREATE", 0xf0, 3, 1);
    CALL = Opcode::new("CALL", 0xf1, 7, 1);
    CALLCODE = Opcode::new("CALLCODE", 0xf2, 7, 1);
    RETURN = Opcode::new("RETURN", 0xf3, 2, 0).terminating();
    DELEGATECALL = Opcode::new("DELEGATECALL", 0xf4, 6, 1);
    CREATE2 = Opcode::new("CREATE2", 0xf5, 4, 1);
    RETURNDATALOAD = Opcode::new("RETURNDATALOAD", 0xf7, 1, 1);
    EXTCALL = Opcode::new("EXTCALL", 0xf8, 4, 1);
    EXTDELEGATECALL = Opcode::new("EXTDELEGATECALL", 0xf9, 3, 1);
    STATICCALL = Opcode::new("STATICCALL", 0xfa, 6, 1);
    EXTSTATICCALL = Opcode::new("EXTSTATICCALL", 0xfb, 3, 1);
    REVERT = Opcode::new("REVERT", 0xfd, 2, 0).terminating();
    INVALID = Opcode::new("INVALID", 0xfe, 0, 0).terminating();
    SELFDESTRUCT = Opcode::new("SELFDESTRUCT", 0xff, 1, 0).terminating();
}

/// Result of looking up a byte value in the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Defined(&'static Opcode),
    /// No opcode is assigned to this byte value.
    Undefined(u8),
}

impl Lookup {
    pub fn defined(self) -> Option<&'static Opcode> {
        match self {
            Lookup::Defined(op) => Some(op),
            Lookup::Undefined(_) => None,
        }
    }
}

/// A mnemonic that does not name any table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMnemonic {
    pub name: String,
}

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown opcode mnemonic `{}`", self.name)
    }
}

impl std::error::Error for UnknownMnemonic {}

fn byte_table() -> &'static [Option<&'static Opcode>; 256] {
    static BY_BYTE: OnceLock<[Option<&'static Opcode>; 256]> = OnceLock::new();
    BY_BYTE.get_or_init(|| {
        let mut table = [None; 256];
        for opcode in op::ALL {
            let slot = &mut table[opcode.byte_value as usize];
            assert!(slot.is_none(), "duplicate opcode byte {:#04x}", opcode.byte_value);
            *slot = Some(opcode);
        }
        table
    })
}

fn mnemonic_table() -> &'static HashMap<&'static str, &'static Opcode> {
    static BY_MNEMONIC: OnceLock<HashMap<&'static str, &'static Opcode>> = OnceLock::new();
    BY_MNEMONIC.get_or_init(|| op::ALL.iter().map(|opcode| (opcode.mnemonic, opcode)).collect())
}

/// Look up the opcode assigned to a byte value.
pub fn lookup(byte_value: u8) -> Lookup {
    match byte_table()[byte_value as usize] {
        Some(opcode) => Lookup::Defined(opcode),
        None => Lookup::Undefined(byte_value),
    }
}

/// Look up the opcode assigned to a byte value, if any.
pub fn get(byte_value: u8) -> Option<&'static Opcode> {
    byte_table()[byte_value as usize]
}

/// Look up an opcode by mnemonic.
pub fn from_mnemonic(name: &str) -> Result<&'static Opcode, UnknownMnemonic> {
    mnemonic_table().get(name).copied().ok_or_else(|| UnknownMnemonic { name: name.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_values_are_unique() {
        // Building the byte table asserts uniqueness internally.
        let defined = byte_table().iter().filter(|slot| slot.is_some()).count();
        assert_eq!(defined, op::ALL.len());
    }

    #[test]
    fn mnemonic_index_covers_every_entry() {
        assert_eq!(mnemonic_table().len(), op::ALL.len());
        for opcode in op::ALL {
            assert_eq!(from_mnemonic(opcode.mnemonic).unwrap(), opcode);
        }
    }

    #[test]
    fn lookup_defined_and_undefined() {
        assert_eq!(lookup(0x00), Lookup::Defined(&op::STOP));
        assert_eq!(lookup(0x60), Lookup::Defined(&op::PUSH1));
        assert_eq!(lookup(0x0c), Lookup::Undefined(0x0c));
        assert_eq!(lookup(0xef), Lookup::Undefined(0xef));
        assert_eq!(get(0xfc), None);
    }

    #[test]
    fn unknown_mnemonic_error() {
        let err = from_mnemonic("FROBNICATE").unwrap_err();
        assert_eq!(err, UnknownMnemonic { name: "FROBNICATE".to_string() });
        assert_eq!(err.to_string(), "unknown opcode mnemonic `FROBNICATE`");
    }

    #[test]
    fn push_data_portions() {
        for n in 1..=32u32 {
            let opcode = get(0x5f + n as u8).unwrap();
            assert_eq!(opcode.data_portion, DataPortion::Fixed(n), "{}", opcode.mnemonic);
            assert_eq!(opcode.pushed_stack_items, 1);
            assert_eq!(opcode.popped_stack_items, 0);
        }
        assert_eq!(op::PUSH0.data_portion, DataPortion::NONE);
    }

    #[test]
    fn dup_swap_log_stack_effects() {
        for n in 0..16u32 {
            let dup = get(0x80 + n as u8).unwrap();
            assert_eq!((dup.popped_stack_items, dup.pushed_stack_items), (n + 1, n + 2));
            let swap = get(0x90 + n as u8).unwrap();
            assert_eq!((swap.popped_stack_items, swap.pushed_stack_items), (n + 2, n + 2));
        }
        for n in 0..=4u32 {
            let log = get(0xa0 + n as u8).unwrap();
            assert_eq!((log.popped_stack_items, log.pushed_stack_items), (n + 2, 0));
        }
    }

    #[test]
    fn rjumpv_uses_jump_table_sentinel() {
        assert_eq!(op::RJUMPV.data_portion, DataPortion::JumpTable);
        assert_eq!(op::RJUMPV.data_portion.fixed_len(), None);
        assert_eq!(op::RJUMP.data_portion.fixed_len(), Some(2));
    }

    #[test]
    fn terminating_flags() {
        for opcode in
            [op::STOP, op::RETF, op::JUMPF, op::RETURNCONTRACT, op::RETURN, op::REVERT, op::INVALID]
        {
            assert!(opcode.terminating, "{}", opcode.mnemonic);
        }
        for opcode in [op::ADD, op::RJUMP, op::CALLF, op::JUMP] {
            assert!(!opcode.terminating, "{}", opcode.mnemonic);
        }
    }
}
