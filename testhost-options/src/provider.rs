//! Provider trait and metadata definitions

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{OptionError, OptionResult};
use crate::parser::CommandLineOptions;
use crate::types::{CommandLineOption, ProviderScope, ValidationResult};

/// Identity of an option provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetadata {
    /// Provider unique identifier
    pub uid: String,
    /// Provider display name
    pub display_name: String,
    /// Provider version
    pub version: String,
    /// Provider description
    pub description: String,
}

impl ProviderMetadata {
    /// Create new provider metadata
    pub fn new(
        uid: impl Into<String>,
        display_name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> OptionResult<Self> {
        let metadata = Self {
            uid: uid.into(),
            display_name: display_name.into(),
            version: version.into(),
            description: description.into(),
        };

        if metadata.uid.trim().is_empty() {
            return Err(OptionError::InvalidProvider {
                reason: "uid cannot be empty".to_string(),
            });
        }
        if metadata.display_name.trim().is_empty() {
            return Err(OptionError::InvalidProvider {
                reason: format!("display name of '{}' cannot be empty", metadata.uid),
            });
        }

        Ok(metadata)
    }
}

/// A source of command-line option declarations plus the validation logic
/// for its own options.
#[async_trait]
pub trait CommandLineOptionsProvider: Send + Sync {
    /// Provider identity
    fn metadata(&self) -> &ProviderMetadata;

    /// Declared options, in declaration order
    fn options(&self) -> &[CommandLineOption];

    /// Surface the options are visible on
    fn scope(&self) -> ProviderScope {
        ProviderScope::Global
    }

    /// Validate the values supplied for one of this provider's options
    async fn validate_option_arguments(
        &self,
        option: &CommandLineOption,
        arguments: &[String],
    ) -> ValidationResult {
        let _ = (option, arguments);
        ValidationResult::valid()
    }

    /// Cross-option checks over the whole parsed command line
    async fn validate_configuration(&self, options: &dyn CommandLineOptions) -> ValidationResult {
        let _ = options;
        ValidationResult::valid()
    }

    /// Find one of this provider's options by name
    fn find_option(&self, name: &str) -> Option<&CommandLineOption> {
        self.options().iter().find(|option| option.name() == name)
    }
}

/// Shared handle to a provider
pub type SharedProvider = Arc<dyn CommandLineOptionsProvider>;

/// Declarative provider whose validation hooks always succeed
#[derive(Debug, Clone)]
pub struct StaticOptionsProvider {
    metadata: ProviderMetadata,
    options: Vec<CommandLineOption>,
    scope: ProviderScope,
}

impl StaticOptionsProvider {
    /// Create a new global provider
    pub fn new(metadata: ProviderMetadata, options: Vec<CommandLineOption>) -> Self {
        Self {
            metadata,
            options,
            scope: ProviderScope::Global,
        }
    }

    /// Scope the provider's options to a tool
    pub fn for_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.scope = ProviderScope::Tool(tool_name.into());
        self
    }

    /// Wrap into a shared handle
    pub fn into_shared(self) -> SharedProvider {
        Arc::new(self)
    }
}

#[async_trait]
impl CommandLineOptionsProvider for StaticOptionsProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn options(&self) -> &[CommandLineOption] {
        &self.options
    }

    fn scope(&self) -> ProviderScope {
        self.scope.clone()
    }
}
