//! Tracing setup shared by the `keysplit` binary and the test suites.

pub mod tracing;
