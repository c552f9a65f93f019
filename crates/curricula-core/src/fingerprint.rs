//! # Document Fingerprints
//!
//! A published curriculum is immutable; a fingerprint of its compact JSON
//! document lets sessions sharing it confirm they hold the same definition.
//!
//! The compact document is deterministic: stages are written in name order,
//! payload keys in key order, transitions in list order.

use crate::Curriculum;
use crate::formats::curriculum_to_json;
use crate::types::CurriculumError;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over raw bytes.
///
/// Fast and deterministic, not collision resistant. For integrity checks
/// against tampering use [`document_hash`] (feature `crypto-hash`).
#[must_use]
pub fn checksum_bytes(data: &[u8]) -> u64 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Deterministic checksum of a curriculum's compact document.
pub fn document_checksum(curriculum: &Curriculum) -> Result<u64, CurriculumError> {
    let json = curriculum_to_json(curriculum)?;
    Ok(checksum_bytes(json.as_bytes()))
}

/// BLAKE3 hex digest of a curriculum's compact document.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn document_hash(curriculum: &Curriculum) -> Result<String, CurriculumError> {
    let json = curriculum_to_json(curriculum)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}

/// Check a curriculum against a previously published BLAKE3 digest.
///
/// # Requires
///
/// This function is only available with the `crypto-hash` feature enabled.
#[cfg(feature = "crypto-hash")]
pub fn verify_document_hash(
    curriculum: &Curriculum,
    expected_hash: &str,
) -> Result<bool, CurriculumError> {
    Ok(document_hash(curriculum)? == expected_hash)
}

// =============================================================================
// TESTS
// =============================================================================
