//! Timeout utilities for page operations
//!
//! Provides async timeout wrappers to prevent indefinite hangs during
//! page navigation, loading, and other browser operations.

use std::future::Future;
use std::time::Duration;

use super::PageError;

/// Wrap an async page operation with an explicit timeout
///
/// Prevents indefinite hangs on page operations by applying `tokio::time::timeout`.
/// Elapsed deadlines become [`PageError::Timeout`], which is the signal the
/// resolver retries on; errors from the operation itself pass through unchanged.
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout_secs` - Timeout duration in seconds
/// * `operation_name` - Human-readable name for error messages
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout_secs: u64,
    operation_name: &str,
) -> Result<T, PageError>
where
    F: Future<Output = Result<T, PageError>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(PageError::Timeout {
            operation: operation_name.to_string(),
            secs: timeout_secs,
        }),
    }
}
