//! # curricula-core
//!
//! The data and rule model for experiment curricula - THE MODEL.
//!
//! A curriculum is a directed graph of stages. Each stage binds a task, the
//! metrics shape that task produces, and an ordered list of transition rules
//! guarded by predicates over live metrics.
//!
//! ## What This Crate Solves
//!
//! - **Cyclic graphs, acyclic documents**: stages are owned by the
//!   curriculum and mention each other by name only, so stage A pointing at
//!   B pointing back at A still serializes to a finite document.
//! - **Serializable predicates**: a rule is written as the qualified name of
//!   a registered function and resolved back to a callable on load.
//! - **Opaque payloads**: task parameters and metrics outputs are preserved
//!   verbatim; typed access is opt-in via [`TaskSpec`] and [`MetricsSpec`].
//!
//! ## Architectural Constraints
//!
//! - NO async, NO I/O: documents go in and out as strings or bytes
//! - NO execution engine: [`Curriculum::decide`] answers one question for
//!   one metrics snapshot; driving an experiment is the caller's job
//! - A loaded curriculum is read-only; share it freely once authoring ends

// =============================================================================
// MODULES
// =============================================================================

pub mod curriculum;
pub mod fingerprint;
pub mod formats;
pub mod metrics;
pub mod primitives;
pub mod rule;
pub mod stage;
pub mod task;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{CurriculumError, Payload, ReferenceMarker, SymbolPart};

// =============================================================================
// RE-EXPORTS: Model
// =============================================================================

pub use curriculum::{Curriculum, DuplicatePolicy, Edge, TransitionDecision};
pub use metrics::{Metrics, MetricsRef, MetricsSpec};
pub use rule::{NamedPredicate, Predicate, QualifiedName, Rule, RuleRegistry, RuleSource};
pub use stage::{Stage, StageReference, TransitionRule};
pub use task::{Task, TaskRef, TaskSpec};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use fingerprint::{checksum_bytes, document_checksum};
#[cfg(feature = "crypto-hash")]
pub use fingerprint::{document_hash, verify_document_hash};
pub use formats::{
    CurriculumDocument, StageDocument, curriculum_from_json, curriculum_from_json_with,
    curriculum_from_slice, curriculum_to_json, curriculum_to_json_pretty, stage_from_json,
    stage_to_json,
};
