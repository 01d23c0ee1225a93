//! Coordination primitives between a running split pass and its caller.

pub mod cancel;
