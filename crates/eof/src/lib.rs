//! EOF (EVM Object Format) V1 container builder.
//!
//! This crate assembles [`Section`]s into serialized EOF containers:
//! magic and version, a header listing each section's kind and size, a
//! terminator, and the concatenated section bodies. Type and data sections
//! can be derived automatically, with stack-height metadata filled in by a
//! best-effort [stack-effect analysis](compute_stack_effect).
//!
//! The builder deliberately does *not* validate well-formedness: wrong
//! magic, mismatched sizes, out-of-order sections and arbitrary trailing
//! bytes are all constructible on purpose, since invalid containers are
//! first-class outputs for conformance testing.

mod analysis;
mod container;
mod error;
mod section;

#[cfg(test)]
mod tests;

pub use analysis::{StackEffect, compute_stack_effect};
pub use container::{AutoSection, Container, ContainerKind};
pub use error::{EofError, Result};
pub use section::{CodeIo, MaxStackHeight, NON_RETURNING, Section, SectionKind, SectionPayload};
