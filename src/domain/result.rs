//! Result type alias for clonework

use super::errors::CloneError;

/// Result type alias for clonework operations
///
/// # Examples
///
/// ```
/// use clonework::domain::result::Result;
/// use clonework::domain::errors::CloneError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(CloneError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CloneError>;
