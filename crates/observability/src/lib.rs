//! Tracing/logging setup shared by test harnesses.

/// Initialize human-readable logging for tests.
///
/// Output is captured by the test harness and only shown for failing tests.
pub fn init_for_tests() {
    tracing::init_for_tests();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
