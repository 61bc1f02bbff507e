//! Collaborators consulted during resolution, plus their file-backed
//! implementations and configuration loading.

pub mod config;
pub mod form_data_cache;
pub mod permalink;
pub mod slices;
pub mod store;
