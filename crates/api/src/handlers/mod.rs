pub mod apps;
pub mod pages;

use gridline_core::error::CoreError;

use crate::error::AppResult;

/// Reject blank names.
fn require_name(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")).into());
    }
    Ok(())
}
