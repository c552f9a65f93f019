//! # Formats Module
//!
//! JSON serialization for curricula and single stages.
//!
//! This module contains pure transformations only; file I/O is in the app
//! layer.
//!
//! ## Security
//!
//! Input size is validated before parsing (`MAX_DOCUMENT_SIZE`) so an
//! oversized document is rejected without being deserialized. Output is held
//! to the same limit.

mod document;

pub use document::*;

use crate::primitives::MAX_DOCUMENT_SIZE;
use crate::rule::RuleRegistry;
use crate::stage::Stage;
use crate::types::CurriculumError;
use crate::Curriculum;

// =============================================================================
// CURRICULUM
// =============================================================================

/// Serialize a curriculum to compact JSON.
pub fn curriculum_to_json(curriculum: &Curriculum) -> Result<String, CurriculumError> {
    let json = serde_json::to_string(&curriculum.to_document())
        .map_err(|e| CurriculumError::SerializationError(e.to_string()))?;
    validate_output_size(json.len(), MAX_DOCUMENT_SIZE)?;
    Ok(json)
}

/// Serialize a curriculum to indented JSON.
pub fn curriculum_to_json_pretty(curriculum: &Curriculum) -> Result<String, CurriculumError> {
    let json = serde_json::to_string_pretty(&curriculum.to_document())
        .map_err(|e| CurriculumError::SerializationError(e.to_string()))?;
    validate_output_size(json.len(), MAX_DOCUMENT_SIZE)?;
    Ok(json)
}

/// Load a curriculum, resolving rules against the process-wide registry.
pub fn curriculum_from_json(json: &str) -> Result<Curriculum, CurriculumError> {
    curriculum_from_slice(json.as_bytes(), RuleRegistry::global())
}

/// Load a curriculum, resolving rules against `registry`.
pub fn curriculum_from_json_with(
    json: &str,
    registry: &RuleRegistry,
) -> Result<Curriculum, CurriculumError> {
    curriculum_from_slice(json.as_bytes(), registry)
}

/// Load a curriculum from raw bytes.
///
/// Either the whole document parses, resolves and links, or an error is
/// returned; a partially linked curriculum is never produced.
pub fn curriculum_from_slice(
    bytes: &[u8],
    registry: &RuleRegistry,
) -> Result<Curriculum, CurriculumError> {
    validate_size(bytes.len(), MAX_DOCUMENT_SIZE)?;

    let document: CurriculumDocument = serde_json::from_slice(bytes)
        .map_err(|e| CurriculumError::DeserializationError(e.to_string()))?;

    Curriculum::from_document(document, registry)
}

// =============================================================================
// STAGE
// =============================================================================

/// Serialize a single stage (full projection) to JSON.
pub fn stage_to_json(stage: &Stage) -> Result<String, CurriculumError> {
    let json = serde_json::to_string(&StageDocument::full(stage))
        .map_err(|e| CurriculumError::SerializationError(e.to_string()))?;
    validate_output_size(json.len(), MAX_DOCUMENT_SIZE)?;
    Ok(json)
}

/// Load a single stage. Transition targets stay unlinked references.
pub fn stage_from_json(json: &str, registry: &RuleRegistry) -> Result<Stage, CurriculumError> {
    validate_size(json.len(), MAX_DOCUMENT_SIZE)?;

    let document: StageDocument = serde_json::from_str(json)
        .map_err(|e| CurriculumError::DeserializationError(e.to_string()))?;

    document.into_stage(registry)
}

/// Reject inputs above `max` bytes before parsing.
pub fn validate_size(len: usize, max: usize) -> Result<(), CurriculumError> {
    if len > max {
        return Err(CurriculumError::DeserializationError(format!(
            "Document size {} bytes exceeds maximum allowed {} bytes",
            len, max
        )));
    }
    Ok(())
}

/// Refuse to emit a document the loaders would reject for its size.
pub fn validate_output_size(len: usize, max: usize) -> Result<(), CurriculumError> {
    if len > max {
        return Err(CurriculumError::SerializationError(format!(
            "Serialized document is {} bytes, above the {} byte load limit",
            len, max
        )));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
