//! Stable exit codes for the explore CLI.

use crate::error::ExploreError;

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid arguments or configuration, or a collaborator store failed.
pub const INVALID: i32 = 1;
/// Permalink, chart, or datasource could not be found.
pub const NOT_FOUND: i32 = 2;
/// Stored or cached data could not be interpreted.
pub const MALFORMED: i32 = 3;

/// Exit code for an error returned by the CLI.
pub fn for_error(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ExploreError>() {
        Some(ExploreError::PermalinkGetFailed { .. } | ExploreError::NotFound { .. }) => NOT_FOUND,
        Some(ExploreError::Malformed(_)) => MALFORMED,
        Some(ExploreError::Store { .. }) | None => INVALID,
    }
}
