//! Deterministic, pure logic for explore state resolution.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! form data and return deterministic outputs suitable for tests.

pub mod adhoc;
pub mod extra_filters;
pub mod legacy_filters;
pub mod pipeline;
pub mod request_params;
pub mod slice_defaults;
pub mod source;
pub mod types;
