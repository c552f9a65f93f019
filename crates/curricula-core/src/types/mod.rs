//! # Core Type Definitions
//!
//! This module contains the types shared by every part of the curriculum model:
//! - The payload map carried by tasks and metrics (`Payload`)
//! - The `is_reference` wire marker for reference projections (`ReferenceMarker`)
//! - Error types (`CurriculumError`, `SymbolPart`)
//!
//! ## Determinism Guarantees
//!
//! Payload maps are `BTreeMap`s, so a given task or metrics record always
//! serializes with the same key order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// PAYLOAD
// =============================================================================

/// Domain fields of a task or metrics record.
///
/// The core preserves these values but never interprets them. Typed access
/// goes through [`crate::TaskSpec`] and [`crate::MetricsSpec`].
pub type Payload = BTreeMap<String, serde_json::Value>;

/// Field names owned by the core. Domain payloads may not use them.
pub const RESERVED_FIELDS: &[&str] = &[
    "name",
    "description",
    "version",
    "schema_version",
    "describedBy",
    "is_reference",
    "task",
];

/// Check whether a payload key collides with a core-owned field.
#[must_use]
pub fn is_reserved_field(key: &str) -> bool {
    RESERVED_FIELDS.contains(&key)
}

// =============================================================================
// REFERENCE MARKER
// =============================================================================

/// The `"is_reference": true` tag written on every reference projection.
///
/// Serializes as the literal `true`. Deserializes from `true` only; an
/// explicit `false` is rejected because a reference projection cannot claim
/// to own its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReferenceMarker;

impl Serialize for ReferenceMarker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(true)
    }
}

impl<'de> Deserialize<'de> for ReferenceMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if bool::deserialize(deserializer)? {
            Ok(Self)
        } else {
            Err(serde::de::Error::custom(
                "reference projection must carry is_reference: true",
            ))
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Which half of a qualified rule name failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPart {
    /// No predicates are registered under the module path.
    Module,
    /// The module exists but has no predicate with that name.
    Symbol,
}

impl std::fmt::Display for SymbolPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolPart::Module => write!(f, "module"),
            SymbolPart::Symbol => write!(f, "symbol"),
        }
    }
}

/// Errors that can occur while building, serializing or loading a curriculum.
///
/// - No silent failures
/// - Every variant is a local validation failure surfaced to the caller
/// - The core never retries and never panics
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// A rule reference string has no `module.symbol` separator.
    #[error("Malformed rule reference '{0}': expected 'module.path.symbol'")]
    MalformedReference(String),

    /// A rule reference names a module or symbol that is not registered.
    #[error("Cannot resolve rule '{reference}': {part} not found")]
    SymbolResolution {
        /// The full qualified name that was looked up.
        reference: String,
        /// Whether the module or the symbol was missing.
        part: SymbolPart,
    },

    /// A live predicate has no registered qualified name (e.g. an anonymous closure).
    #[error("Predicate has no qualified name; only registered named functions can be rules")]
    UnresolvableSymbol,

    /// Two different predicates were registered under one qualified name.
    #[error("Rule symbol '{0}' is already bound to a different predicate")]
    SymbolConflict(String),

    /// A transition points at a stage name absent from the curriculum.
    #[error("Transition from '{from}' targets unknown stage '{target}'")]
    DanglingTransitionTarget {
        /// Stage owning the transition.
        from: String,
        /// Name of the missing target.
        target: String,
    },

    /// A stage name appears more than once.
    #[error("Duplicate stage name: {0}")]
    DuplicateStageName(String),

    /// A stage, task or metrics record violates a construction-time invariant.
    #[error("Invalid stage state: {0}")]
    InvalidStageState(String),

    /// `pop_transition` was called with an index past the end of the list.
    #[error("Transition index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of transitions on the stage.
        len: usize,
    },

    /// The named stage does not exist in the curriculum.
    #[error("Stage not found: {0}")]
    StageNotFound(String),

    /// A payload key collides with a field owned by the core.
    #[error("Payload field '{0}' is reserved")]
    ReservedField(String),

    /// A typed decode was attempted against a record of another kind.
    #[error("Payload mismatch: expected '{expected}', found '{found}'")]
    PayloadMismatch {
        /// Discriminant the caller asked for.
        expected: String,
        /// Discriminant carried by the record.
        found: String,
    },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The rule registry lock was poisoned by a panicking writer.
    #[error("Rule registry lock poisoned")]
    RegistryPoisoned,
}

// =============================================================================
// TESTS
// =============================================================================
