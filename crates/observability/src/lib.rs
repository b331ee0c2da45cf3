//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide tracing with JSON output and an `info` default.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::Json);
}

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::LogFormat;
