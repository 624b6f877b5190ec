//! Option model type definitions

use std::fmt;

use crate::error::{OptionError, OptionResult};

/// Allowed number of argument values for an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgumentArity {
    min: u32,
    max: u32,
}

impl ArgumentArity {
    /// Upper bound used for options accepting any number of values
    pub const UNBOUNDED: u32 = u32::MAX;

    /// Flag option, no value accepted
    pub const ZERO: Self = Self { min: 0, max: 0 };
    /// Optional single value
    pub const ZERO_OR_ONE: Self = Self { min: 0, max: 1 };
    /// Exactly one value
    pub const EXACTLY_ONE: Self = Self { min: 1, max: 1 };
    /// Any number of values
    pub const ZERO_OR_MORE: Self = Self {
        min: 0,
        max: Self::UNBOUNDED,
    };
    /// At least one value
    pub const ONE_OR_MORE: Self = Self {
        min: 1,
        max: Self::UNBOUNDED,
    };

    /// Create a new arity, rejecting `max < min`
    pub fn new(min: u32, max: u32) -> OptionResult<Self> {
        if max < min {
            return Err(OptionError::InvalidArity { min, max });
        }
        Ok(Self { min, max })
    }

    /// Lower bound
    pub fn min(&self) -> u32 {
        self.min
    }

    /// Upper bound, [`ArgumentArity::UNBOUNDED`] when open-ended
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether the option is a flag that takes no value
    pub fn is_flag(&self) -> bool {
        self.max == 0
    }

    /// Whether there is no upper bound
    pub fn is_unbounded(&self) -> bool {
        self.max == Self::UNBOUNDED
    }
}

impl fmt::Display for ArgumentArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unbounded() {
            write!(f, "{}..", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

/// A single command-line option declared by a provider.
///
/// Names are stored without leading dashes and compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLineOption {
    name: String,
    description: String,
    arity: ArgumentArity,
    is_hidden: bool,
    is_built_in: bool,
}

impl CommandLineOption {
    /// Create an option contributed by an extension
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        arity: ArgumentArity,
        is_hidden: bool,
    ) -> OptionResult<Self> {
        Self::create(name.into(), description.into(), arity, is_hidden, false)
    }

    /// Create an option owned by the platform itself
    pub fn built_in(
        name: impl Into<String>,
        description: impl Into<String>,
        arity: ArgumentArity,
        is_hidden: bool,
    ) -> OptionResult<Self> {
        Self::create(name.into(), description.into(), arity, is_hidden, true)
    }

    fn create(
        name: String,
        description: String,
        arity: ArgumentArity,
        is_hidden: bool,
        is_built_in: bool,
    ) -> OptionResult<Self> {
        let name = name.trim().trim_start_matches('-').to_string();
        if name.is_empty() {
            return Err(OptionError::EmptyName);
        }

        if let Some(character) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '?'))
        {
            return Err(OptionError::InvalidName { name, character });
        }

        if description.trim().is_empty() {
            return Err(OptionError::EmptyDescription { name });
        }

        Ok(Self {
            name,
            description,
            arity,
            is_hidden,
            is_built_in,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn arity(&self) -> ArgumentArity {
        self.arity
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn is_built_in(&self) -> bool {
        self.is_built_in
    }
}

/// Surface on which a provider's options are visible
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ProviderScope {
    /// Options available on every invocation
    #[default]
    Global,
    /// Options only available when the named tool is invoked
    Tool(String),
}

impl ProviderScope {
    /// Whether this scope is active for the invoked tool (if any)
    pub fn is_active_for(&self, tool_name: Option<&str>) -> bool {
        match self {
            Self::Global => true,
            Self::Tool(name) => tool_name == Some(name.as_str()),
        }
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}

impl fmt::Display for ProviderScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Tool(name) => write!(f, "tool:{}", name),
        }
    }
}

/// Outcome of a validation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error_message: Option<String>,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
        }
    }

    /// Create an invalid result
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(error.into()),
        }
    }

    /// Valid when no lines were collected, otherwise invalid with the lines
    /// joined by newlines
    pub fn from_lines(lines: Vec<String>) -> Self {
        if lines.is_empty() {
            Self::valid()
        } else {
            Self::invalid(lines.join("\n"))
        }
    }

    /// Error message, empty when valid
    pub fn message(&self) -> &str {
        self.error_message.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_bounds() {
        assert!(ArgumentArity::new(1, 1).is_ok());
        assert!(ArgumentArity::new(0, 0).unwrap().is_flag());
        assert_eq!(
            ArgumentArity::new(2, 1),
            Err(OptionError::InvalidArity { min: 2, max: 1 })
        );
        assert!(ArgumentArity::ONE_OR_MORE.is_unbounded());
        assert_eq!(ArgumentArity::ZERO_OR_MORE.to_string(), "0..");
        assert_eq!(ArgumentArity::EXACTLY_ONE.to_string(), "1..1");
    }

    #[test]
    fn test_option_name_normalisation() {
        let option =
            CommandLineOption::new("--retries", "Retry count", ArgumentArity::EXACTLY_ONE, false)
                .unwrap();
        assert_eq!(option.name(), "retries");
        assert!(!option.is_built_in());

        let built_in =
            CommandLineOption::built_in("help", "Show help", ArgumentArity::ZERO, false).unwrap();
        assert!(built_in.is_built_in());
    }

    #[test]
    fn test_option_name_rules() {
        assert_eq!(
            CommandLineOption::new("--", "desc", ArgumentArity::ZERO, false),
            Err(OptionError::EmptyName)
        );
        assert!(matches!(
            CommandLineOption::new("bad name", "desc", ArgumentArity::ZERO, false),
            Err(OptionError::InvalidName { character: ' ', .. })
        ));
        assert!(CommandLineOption::new("?", "desc", ArgumentArity::ZERO, false).is_ok());
        assert!(matches!(
            CommandLineOption::new("flag", "  ", ArgumentArity::ZERO, false),
            Err(OptionError::EmptyDescription { .. })
        ));
    }

    #[test]
    fn test_scope_activation() {
        assert!(ProviderScope::Global.is_active_for(None));
        assert!(ProviderScope::Global.is_active_for(Some("merge")));

        let tool = ProviderScope::Tool("merge".to_string());
        assert!(tool.is_active_for(Some("merge")));
        assert!(!tool.is_active_for(Some("other")));
        assert!(!tool.is_active_for(None));
    }

    #[test]
    fn test_validation_result_from_lines() {
        assert!(ValidationResult::from_lines(Vec::new()).is_valid);

        let result = ValidationResult::from_lines(vec!["a".to_string(), "b".to_string()]);
        assert!(!result.is_valid);
        assert_eq!(result.message(), "a\nb");
    }
}
