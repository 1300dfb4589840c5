//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors into `NetError` variants.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Mark an IO error as a failure to produce request body bytes.
    ///
    /// # Example
    /// ```ignore
    /// use stacknet::base::context::IoResultExt;
    ///
    /// let data = std::fs::read(path).body_context()?;
    /// ```
    fn body_context(self) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn body_context(self) -> Result<T, NetError> {
        self.map_err(NetError::body_serialization)
    }
}
