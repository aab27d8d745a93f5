//! `Result<Option<T>>` helpers for store lookups.

use crate::foundation::CosignError;

/// Extension for converting `Result<Option<T>>` into `Result<T>`.
pub trait ResultExt<T> {
    /// Convert `Ok(None)` into an error.
    fn required(self, error: impl FnOnce() -> CosignError) -> Result<T, CosignError>;
}

impl<T> ResultExt<T> for Result<Option<T>, CosignError> {
    fn required(self, error: impl FnOnce() -> CosignError) -> Result<T, CosignError> {
        self?.ok_or_else(error)
    }
}
