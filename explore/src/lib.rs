//! Explore state resolution.
//!
//! Given a request for a chart-editing ("explore") view, this crate resolves
//! the single form-data mapping that should drive rendering. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (source precedence pieces, filter
//!   migration and merging, request-parameter merging). No I/O.
//! - **[`io`]**: Collaborators (permalink store, form-data cache, slice
//!   repository) as traits, with file-backed implementations and config.
//!
//! [`command::GetExploreCommand`] coordinates [`resolve`], [`loader`] and
//! [`assemble`] to produce an [`core::types::ExploreResponse`].

pub mod assemble;
pub mod command;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod loader;
pub mod logging;
pub mod resolve;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
