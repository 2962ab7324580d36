//! # Readiness Primitives
//!
//! Hardcoded runtime constants for the Ladder CORE.
//!
//! These values are compiled into the binary and are immutable at runtime.

/// Lowest level of the readiness scale. Also the floor of every cached level.
pub const MIN_LEVEL: u8 = 1;

/// Highest level of the readiness scale.
pub const MAX_LEVEL: u8 = 9;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for claim titles, in bytes.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Maximum length for claim subtitles, in bytes.
pub const MAX_SUBTITLE_LENGTH: usize = 255;

/// Maximum length for evidence descriptions, in bytes.
pub const MAX_DESCRIPTION_LENGTH: usize = 8 * 1024;

/// Maximum length for evidence file references, in bytes.
///
/// The reference is an opaque URL owned by the file-storage collaborator;
/// only its length is checked.
pub const MAX_FILE_URL_LENGTH: usize = 2048;

/// Maximum length for reviewer notes, in bytes.
pub const MAX_NOTES_LENGTH: usize = 4 * 1024;

/// Maximum number of startups a single portfolio read fans out to.
///
/// Aggregation is recomputed on every read, so the fan-out must stay bounded.
pub const MAX_PORTFOLIO_SIZE: usize = 1000;

/// Monetary amounts are stored in minor units (cents).
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

// =============================================================================
// TESTS
// =============================================================================
