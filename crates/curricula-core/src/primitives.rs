//! # Format Primitives
//!
//! Fixed constants of the curriculum document format.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Schema version written on tasks, metrics and curricula when none is given.
pub const DEFAULT_SCHEMA_VERSION: &str = "0.1.0";

/// Version written on tasks when none is given.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Default `describedBy` link.
pub const DEFAULT_DESCRIBED_BY: &str = "tbd_link.url";

/// Separator between the module path and the symbol name of a rule reference.
///
/// A qualified name is `"<module-path>.<symbol-name>"`; the module path may
/// itself contain separators, so resolution splits on the LAST one.
pub const QUALIFIED_NAME_SEPARATOR: char = '.';

/// Separator Rust uses inside `module_path!()`.
pub const RUST_PATH_SEPARATOR: &str = "::";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a curriculum document accepted for parsing (16 MB).
///
/// Checked BEFORE deserialization so an oversized input never allocates a
/// full document tree, and after serialization so nothing is written that
/// could not be read back. Also bounds the stage count.
pub const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Maximum number of outgoing transitions on a single stage.
pub const MAX_TRANSITIONS_PER_STAGE: usize = 1_000;
