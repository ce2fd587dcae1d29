//! Sections of an EOF container.

use crate::{
    analysis::{StackEffect, compute_stack_effect},
    container::Container,
    error::{EofError, Result},
};
use alloy_primitives::Bytes;
use eof_bytecode::Bytecode;
use std::fmt;

/// Kind byte of a section.
///
/// The known kinds are the `TYPE`/`CODE`/`CONTAINER`/`DATA` constants;
/// arbitrary values stay representable so malformed containers can carry
/// bogus kind bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionKind(pub u8);

impl SectionKind {
    pub const TYPE: SectionKind = SectionKind(0x01);
    pub const CODE: SectionKind = SectionKind(0x02);
    pub const CONTAINER: SectionKind = SectionKind(0x03);
    pub const DATA: SectionKind = SectionKind(0x04);
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SectionKind::TYPE => f.write_str("type"),
            SectionKind::CODE => f.write_str("code"),
            SectionKind::CONTAINER => f.write_str("container"),
            SectionKind::DATA => f.write_str("data"),
            SectionKind(other) => write!(f, "kind({other:#04x})"),
        }
    }
}

/// `code_outputs` sentinel marking a section that never returns via `RETF`.
pub const NON_RETURNING: u8 = 0x80;

/// Payload of a section. A CONTAINER-kind section may hold a nested
/// [`Container`], serialized lazily when the parent is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionPayload {
    Bytes(Bytes),
    Code(Bytecode),
    Container(Box<Container>),
}

/// Where a code section's type-entry inputs/outputs come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeIo {
    /// Derive from [`compute_stack_effect`] at serialization time.
    Auto,
    Fixed { inputs: u8, outputs: u8 },
}

/// Where a code section's type-entry max stack height comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxStackHeight {
    /// Derive from [`compute_stack_effect`] at serialization time.
    Auto,
    Fixed(u16),
}

/// One section of an EOF container.
///
/// Sections are built once through the factory constructors and treated as
/// immutable; the `with_*`/`skip_*` methods are copy-on-modify overrides.
/// The listing flags exist for malformed-container authoring: a section can
/// be dropped from the header, the body, or the derived type section
/// independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub payload: SectionPayload,
    /// Advisory header size override. May disagree with the payload length;
    /// the header is metadata, not a structural constraint.
    pub custom_size: Option<u16>,
    /// List this section in the type section even if it is not CODE.
    pub force_type_listing: bool,
    pub code_io: CodeIo,
    pub max_stack_height: MaxStackHeight,
    pub skip_header_listing: bool,
    pub skip_body_listing: bool,
    pub skip_types_body_listing: bool,
    pub skip_types_header_listing: bool,
}

impl Section {
    fn new(kind: SectionKind, payload: SectionPayload) -> Self {
        Self {
            kind,
            payload,
            custom_size: None,
            force_type_listing: false,
            code_io: CodeIo::Fixed { inputs: 0, outputs: NON_RETURNING },
            max_stack_height: MaxStackHeight::Fixed(0),
            skip_header_listing: false,
            skip_body_listing: false,
            skip_types_body_listing: false,
            skip_types_header_listing: false,
        }
    }

    /// CODE section. The max stack height defaults to the bytecode's own
    /// tracked bound; inputs/outputs default to a non-returning section
    /// taking no arguments.
    pub fn code(code: Bytecode) -> Self {
        let max_stack_height = MaxStackHeight::Fixed(code.max_stack_height as u16);
        let mut section = Self::new(SectionKind::CODE, SectionPayload::Code(code));
        section.max_stack_height = max_stack_height;
        section
    }

    /// CODE section over raw bytes, with no derived metadata.
    pub fn raw_code(bytes: impl Into<Bytes>) -> Self {
        Self::new(SectionKind::CODE, SectionPayload::Bytes(bytes.into()))
    }

    /// CONTAINER section holding a nested container, serialized when the
    /// parent is emitted.
    pub fn container(container: Container) -> Self {
        Self::new(SectionKind::CONTAINER, SectionPayload::Container(Box::new(container)))
    }

    /// CONTAINER section over pre-serialized bytes.
    pub fn raw_container(bytes: impl Into<Bytes>) -> Self {
        Self::new(SectionKind::CONTAINER, SectionPayload::Bytes(bytes.into()))
    }

    /// DATA section.
    pub fn data(bytes: impl Into<Bytes>) -> Self {
        Self::new(SectionKind::DATA, SectionPayload::Bytes(bytes.into()))
    }

    /// Section of an arbitrary kind, including undefined kind bytes.
    pub fn raw(kind: SectionKind, bytes: impl Into<Bytes>) -> Self {
        Self::new(kind, SectionPayload::Bytes(bytes.into()))
    }

    pub fn with_custom_size(mut self, size: u16) -> Self {
        self.custom_size = Some(size);
        self
    }

    pub fn with_code_inputs(mut self, inputs: u8) -> Self {
        let outputs = match self.code_io {
            CodeIo::Fixed { outputs, .. } => outputs,
            CodeIo::Auto => NON_RETURNING,
        };
        self.code_io = CodeIo::Fixed { inputs, outputs };
        self
    }

    pub fn with_code_outputs(mut self, outputs: u8) -> Self {
        let inputs = match self.code_io {
            CodeIo::Fixed { inputs, .. } => inputs,
            CodeIo::Auto => 0,
        };
        self.code_io = CodeIo::Fixed { inputs, outputs };
        self
    }

    pub fn with_auto_code_io(mut self) -> Self {
        self.code_io = CodeIo::Auto;
        self
    }

    pub fn with_max_stack_height(mut self, height: u16) -> Self {
        self.max_stack_height = MaxStackHeight::Fixed(height);
        self
    }

    pub fn with_auto_max_stack_height(mut self) -> Self {
        self.max_stack_height = MaxStackHeight::Auto;
        self
    }

    pub fn with_force_type_listing(mut self) -> Self {
        self.force_type_listing = true;
        self
    }

    pub fn without_header_listing(mut self) -> Self {
        self.skip_header_listing = true;
        self
    }

    pub fn without_body_listing(mut self) -> Self {
        self.skip_body_listing = true;
        self
    }

    pub fn without_types_header_listing(mut self) -> Self {
        self.skip_types_header_listing = true;
        self
    }

    pub fn without_types_body_listing(mut self) -> Self {
        self.skip_types_body_listing = true;
        self
    }

    /// The payload bytes as they appear in the container body. Nested
    /// containers are serialized here, so their self-checks propagate.
    pub fn body_bytes(&self) -> Result<Bytes> {
        match &self.payload {
            SectionPayload::Bytes(bytes) => Ok(bytes.clone()),
            SectionPayload::Code(code) => Ok(code.to_bytes()),
            SectionPayload::Container(container) => container.serialize(),
        }
    }

    /// The size listed in the header: `custom_size` when set, else the
    /// payload length. A payload longer than `u16::MAX` has no honest
    /// header encoding and is rejected.
    pub fn size(&self) -> Result<u16> {
        match self.custom_size {
            Some(size) => Ok(size),
            None => {
                let len = self.body_bytes()?.len();
                len.try_into().map_err(|_| EofError::SectionTooLarge { kind: self.kind, len })
            }
        }
    }

    /// Standalone header entry `kind(1) || size(2, big-endian)`.
    ///
    /// CODE sections are only ever headered as a group (see
    /// [`Section::list_header`]), so calling this on one is a logic error.
    pub fn header_bytes(&self) -> Result<Vec<u8>> {
        if self.kind == SectionKind::CODE {
            return Err(EofError::CodeSectionRequiresGroupHeader);
        }
        let mut out = vec![self.kind.0];
        out.extend_from_slice(&self.size()?.to_be_bytes());
        Ok(out)
    }

    /// Type-section entry `inputs(1) || outputs(1) || max_stack_height(2)`
    /// for CODE (or force-listed) sections; empty bytes otherwise.
    pub fn type_definition_bytes(&self) -> Result<Vec<u8>> {
        if self.kind != SectionKind::CODE && !self.force_type_listing {
            return Ok(Vec::new());
        }
        let needs_analysis = self.code_io == CodeIo::Auto
            || self.max_stack_height == MaxStackHeight::Auto;
        let effect =
            if needs_analysis { compute_stack_effect(&self.body_bytes()?) } else { StackEffect::default() };
        let (inputs, outputs) = match self.code_io {
            CodeIo::Auto => (effect.inputs, effect.outputs),
            CodeIo::Fixed { inputs, outputs } => (inputs, outputs),
        };
        let max_stack_height = match self.max_stack_height {
            MaxStackHeight::Auto => effect.max_stack_height,
            MaxStackHeight::Fixed(height) => height,
        };
        let mut out = vec![inputs, outputs];
        out.extend_from_slice(&max_stack_height.to_be_bytes());
        Ok(out)
    }

    /// Header entry for a homogeneous run of sections.
    ///
    /// CODE and CONTAINER runs are grouped under one
    /// `kind(1) || count(2) || size(2) per section` prefix; other kinds
    /// concatenate their standalone header entries. Sections flagged
    /// `skip_header_listing` contribute nothing either way.
    pub fn list_header(sections: &[&Section]) -> Result<Vec<u8>> {
        let Some(first) = sections.first() else {
            return Ok(Vec::new());
        };
        let listed: Vec<&Section> =
            sections.iter().copied().filter(|section| !section.skip_header_listing).collect();
        if first.kind == SectionKind::CODE || first.kind == SectionKind::CONTAINER {
            if listed.is_empty() {
                return Ok(Vec::new());
            }
            let mut out = vec![first.kind.0];
            out.extend_from_slice(&(listed.len() as u16).to_be_bytes());
            for section in &listed {
                out.extend_from_slice(&section.size()?.to_be_bytes());
            }
            Ok(out)
        } else {
            let mut out = Vec::new();
            for section in &listed {
                out.extend_from_slice(&section.header_bytes()?);
            }
            Ok(out)
        }
    }
}
