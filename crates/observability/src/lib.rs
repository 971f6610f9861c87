//! Process-wide diagnostics setup.
//!
//! Narrative zoo lines go to the log sink and stdout; everything here is
//! diagnostics written to stderr.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
