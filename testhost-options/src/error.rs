//! Option model error types

use thiserror::Error;

/// Option model result type
pub type OptionResult<T> = Result<T, OptionError>;

/// Contract violations raised while building options or providers.
///
/// Validation of user input never produces these; it is reported through
/// [`crate::ValidationResult`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    /// Option name is empty or whitespace
    #[error("Option name cannot be empty")]
    EmptyName,

    /// Option description is empty or whitespace
    #[error("Option '{name}' must have a description")]
    EmptyDescription { name: String },

    /// Option name contains a character outside the allowed set
    #[error("Option '{name}' contains invalid character '{character}'")]
    InvalidName { name: String, character: char },

    /// Arity upper bound below its lower bound
    #[error("Invalid arity: max ({max}) must be greater than or equal to min ({min})")]
    InvalidArity { min: u32, max: u32 },

    /// Provider metadata is incomplete
    #[error("Provider metadata is invalid: {reason}")]
    InvalidProvider { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = OptionError::InvalidArity { min: 2, max: 1 };
        assert_eq!(
            err.to_string(),
            "Invalid arity: max (1) must be greater than or equal to min (2)"
        );

        let err = OptionError::InvalidName {
            name: "bad name".to_string(),
            character: ' ',
        };
        assert!(err.to_string().contains("bad name"));
    }
}
