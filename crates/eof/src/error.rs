//! Error types for container assembly

use crate::section::SectionKind;
use alloy_primitives::Bytes;
use std::fmt;

/// Error type for container assembly and serialization.
///
/// Malformed containers are not errors here: the builder exists to produce
/// them. The only failure modes are caller-side logic errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EofError {
    /// Serialized bytes differ from the container's `expected_bytecode`
    /// self-check.
    BytecodeMismatch { expected: Bytes, actual: Bytes },
    /// A CODE section was headered in isolation; CODE sections are only
    /// ever listed as a group (kind, count, then one size per section).
    CodeSectionRequiresGroupHeader,
    /// A section payload is too long for the two-byte header size field.
    /// `custom_size` can still claim any size for such a payload.
    SectionTooLarge { kind: SectionKind, len: usize },
}

impl fmt::Display for EofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofError::BytecodeMismatch { expected, actual } => {
                write!(f, "serialized container {actual} does not match expected {expected}")
            }
            EofError::CodeSectionRequiresGroupHeader => {
                write!(f, "code sections must be headered as a group")
            }
            EofError::SectionTooLarge { kind, len } => {
                write!(f, "{kind} section payload of {len} bytes does not fit a u16 header size")
            }
        }
    }
}

impl std::error::Error for EofError {}

/// Result type for container assembly operations
pub type Result<T> = std::result::Result<T, EofError>;
