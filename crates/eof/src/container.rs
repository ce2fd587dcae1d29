//! EOF container assembly and serialization.

use crate::{
    error::{EofError, Result},
    section::{Section, SectionKind},
};
use alloy_primitives::{Bytes, FixedBytes, fixed_bytes, hex};
use eof_bytecode::Bytecode;
use eof_opcodes::op;
use std::{fmt, sync::OnceLock};

/// Whether an auto-derived section participates in the header, the body,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoSection {
    /// Derive the section and list it in header and body.
    #[default]
    Auto,
    /// Derive the section but list it only in the header.
    OnlyHeader,
    /// Derive the section but list it only in the body.
    OnlyBody,
    /// No automatic derivation.
    None,
}

impl AutoSection {
    pub fn enabled(self) -> bool {
        self != AutoSection::None
    }

    pub fn in_header(self) -> bool {
        matches!(self, AutoSection::Auto | AutoSection::OnlyHeader)
    }

    pub fn in_body(self) -> bool {
        matches!(self, AutoSection::Auto | AutoSection::OnlyBody)
    }
}

/// What the container is meant to be deployed as. Serialization is
/// identical either way; collaborators use this to decide how to wrap the
/// bytes (deploy transaction vs. `EOFCREATE` argument).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerKind {
    #[default]
    Runtime,
    Initcode,
}

/// An ordered collection of [`Section`]s plus format-level fields.
///
/// Serialization is a pure function of the fields; [`Container::bytecode`]
/// memoizes it per instance. Every field is deliberately overridable so
/// malformed containers (wrong magic, bad sizes, trailing garbage) remain
/// constructible for negative tests.
#[derive(Debug)]
pub struct Container {
    pub name: Option<String>,
    pub sections: Vec<Section>,
    pub magic: FixedBytes<2>,
    pub version: FixedBytes<1>,
    pub header_terminator: FixedBytes<1>,
    /// Arbitrary bytes appended after the body.
    pub extra: Bytes,
    pub auto_type_section: AutoSection,
    /// Append an empty DATA section when none is present.
    pub auto_data_section: bool,
    pub auto_sort_sections: AutoSection,
    /// Emit one header entry per section instead of grouping runs of
    /// same-kind sections under a single kind+count prefix.
    pub skip_join_concurrent_sections_in_header: bool,
    pub kind: ContainerKind,
    /// Opaque replacement for the whole serialization; `sections` must be
    /// empty when set.
    pub raw_bytes: Option<Bytes>,
    /// Construction-time self-check against the serialized bytes.
    pub expected_bytecode: Option<Bytes>,
    pub(crate) cache: OnceLock<Bytes>,
}

impl Container {
    pub const DEFAULT_MAGIC: FixedBytes<2> = fixed_bytes!("ef00");
    pub const VERSION_1: FixedBytes<1> = fixed_bytes!("01");
    pub const HEADER_TERMINATOR: FixedBytes<1> = fixed_bytes!("00");

    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections, ..Self::default() }
    }

    /// Container holding a single CODE section.
    pub fn code(code: Bytecode) -> Self {
        Self::new(vec![Section::code(code)])
    }

    /// Container holding a single CODE section over raw bytes.
    pub fn raw_code(bytes: impl Into<Bytes>) -> Self {
        Self::new(vec![Section::raw_code(bytes)])
    }

    /// Opaque container that serializes to exactly `bytes`.
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self { raw_bytes: Some(bytes.into()), ..Self::default() }
    }

    /// Initcode wrapper deploying `deploy_container`: a CODE section that
    /// returns container 0 (`PUSH1 0, PUSH1 0, RETURNCONTRACT[0]`) plus a
    /// CONTAINER section holding the deployed container.
    pub fn init(deploy_container: Container) -> Self {
        let initcode = Bytecode::op_with_immediate(op::PUSH1, &[0])
            .concat(&Bytecode::op_with_immediate(op::PUSH1, &[0]))
            .concat(&Bytecode::op_with_immediate(op::RETURNCONTRACT, &[0]));
        Self {
            kind: ContainerKind::Initcode,
            sections: vec![Section::code(initcode), Section::container(deploy_container)],
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.cache = OnceLock::new();
        self
    }

    pub fn with_expected_bytecode(mut self, expected: impl Into<Bytes>) -> Self {
        self.expected_bytecode = Some(expected.into());
        self.cache = OnceLock::new();
        self
    }

    /// Serialized container bytes, memoized per instance. Recomputation is
    /// deterministic, so a publication race merely duplicates work.
    pub fn bytecode(&self) -> Result<Bytes> {
        if let Some(cached) = self.cache.get() {
            return Ok(cached.clone());
        }
        let bytes = self.serialize()?;
        Ok(self.cache.get_or_init(|| bytes).clone())
    }

    /// Serialize the container.
    pub fn serialize(&self) -> Result<Bytes> {
        if let Some(raw) = &self.raw_bytes {
            debug_assert!(self.sections.is_empty(), "raw container must have no sections");
            return Ok(raw.clone());
        }

        let mut out = Vec::new();
        out.extend_from_slice(self.magic.as_slice());
        out.extend_from_slice(self.version.as_slice());

        let sections = self.derive_sections()?;

        // Header: kind+size entries, with runs of same-kind sections
        // grouped under one kind+count prefix.
        let mut header_sections: Vec<&Section> = sections
            .iter()
            .filter(|section| {
                !(section.kind == SectionKind::TYPE
                    && self.auto_type_section == AutoSection::OnlyBody)
            })
            .collect();
        if self.auto_sort_sections.in_header() {
            // Stable by kind, so equal-kind sections keep their relative
            // order even when the caller's list is deliberately shuffled.
            header_sections.sort_by_key(|section| section.kind.0);
        }
        let mut start = 0;
        while start < header_sections.len() {
            let kind = header_sections[start].kind;
            let mut end = start + 1;
            if !self.skip_join_concurrent_sections_in_header {
                while end < header_sections.len() && header_sections[end].kind == kind {
                    end += 1;
                }
            }
            out.extend_from_slice(&Section::list_header(&header_sections[start..end])?);
            start = end;
        }

        out.extend_from_slice(self.header_terminator.as_slice());

        // Body: same sections, original order unless sorted independently.
        let mut body_sections: Vec<&Section> = sections.iter().collect();
        if self.auto_sort_sections.in_body() {
            body_sections.sort_by_key(|section| section.kind.0);
        }
        for section in body_sections {
            if section.kind == SectionKind::TYPE
                && self.auto_type_section == AutoSection::OnlyHeader
            {
                continue;
            }
            if section.skip_body_listing {
                continue;
            }
            out.extend_from_slice(&section.body_bytes()?);
        }

        out.extend_from_slice(&self.extra);

        let bytes = Bytes::from(out);
        if let Some(expected) = &self.expected_bytecode {
            if bytes != *expected {
                return Err(EofError::BytecodeMismatch { expected: expected.clone(), actual: bytes });
            }
        }
        Ok(bytes)
    }

    /// The section list after auto-derivation: a synthesized TYPE section
    /// prepended and an empty DATA section appended, each only when enabled
    /// and not already present.
    fn derive_sections(&self) -> Result<Vec<Section>> {
        let mut sections = self.sections.clone();

        if self.auto_type_section.enabled()
            && !sections.iter().any(|section| section.kind == SectionKind::TYPE)
        {
            let mut body = Vec::new();
            let mut header_size: u16 = 0;
            for section in &sections {
                let entry = section.type_definition_bytes()?;
                if !section.skip_types_body_listing {
                    body.extend_from_slice(&entry);
                }
                if !section.skip_types_header_listing {
                    header_size += entry.len() as u16;
                }
            }
            sections.insert(
                0,
                Section::raw(SectionKind::TYPE, body).with_custom_size(header_size),
            );
        }

        if self.auto_data_section
            && !sections.iter().any(|section| section.kind == SectionKind::DATA)
        {
            sections.push(Section::data(Bytes::new()));
        }

        Ok(sections)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self {
            name: None,
            sections: Vec::new(),
            magic: Self::DEFAULT_MAGIC,
            version: Self::VERSION_1,
            header_terminator: Self::HEADER_TERMINATOR,
            extra: Bytes::new(),
            auto_type_section: AutoSection::Auto,
            auto_data_section: true,
            auto_sort_sections: AutoSection::Auto,
            skip_join_concurrent_sections_in_header: false,
            kind: ContainerKind::Runtime,
            raw_bytes: None,
            expected_bytecode: None,
            cache: OnceLock::new(),
        }
    }
}

// Clones start with an empty memoization cache, so a modified copy never
// serves the original's serialized bytes.
impl Clone for Container {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sections: self.sections.clone(),
            magic: self.magic,
            version: self.version,
            header_terminator: self.header_terminator,
            extra: self.extra.clone(),
            auto_type_section: self.auto_type_section,
            auto_data_section: self.auto_data_section,
            auto_sort_sections: self.auto_sort_sections,
            skip_join_concurrent_sections_in_header: self.skip_join_concurrent_sections_in_header,
            kind: self.kind,
            raw_bytes: self.raw_bytes.clone(),
            expected_bytecode: self.expected_bytecode.clone(),
            cache: OnceLock::new(),
        }
    }
}

// The memoization cache is not part of the container's identity.
impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.sections == other.sections
            && self.magic == other.magic
            && self.version == other.version
            && self.header_terminator == other.header_terminator
            && self.extra == other.extra
            && self.auto_type_section == other.auto_type_section
            && self.auto_data_section == other.auto_data_section
            && self.auto_sort_sections == other.auto_sort_sections
            && self.skip_join_concurrent_sections_in_header
                == other.skip_join_concurrent_sections_in_header
            && self.kind == other.kind
            && self.raw_bytes == other.raw_bytes
            && self.expected_bytecode == other.expected_bytecode
    }
}

impl Eq for Container {}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}: ")?;
        }
        match self.serialize() {
            Ok(bytes) => f.write_str(&hex::encode_prefixed(&bytes)),
            Err(err) => write!(f, "<{err}>"),
        }
    }
}
