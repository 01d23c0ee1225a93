use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The delimiter is a space or a line terminator.
    #[error("`{field}` must not be a space or a line terminator, got {value:?}")]
    InvalidDelimiter { field: String, value: char },
    /// A required text field is empty.
    #[error("`{field}` cannot be empty")]
    EmptyField { field: String },
    /// A numeric field is outside of its allowed range.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}

/// Checks that `value` can separate fields on a single line.
pub(crate) fn validate_delimiter(field: &str, value: char) -> Result<(), ValidationError> {
    if matches!(value, ' ' | '\n' | '\r') {
        return Err(ValidationError::InvalidDelimiter {
            field: field.to_string(),
            value,
        });
    }

    Ok(())
}
