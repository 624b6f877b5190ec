//! Command-line handler: the single entry point running validation and
//! displaying its diagnostic

use async_trait::async_trait;
use std::path::Path;

use crate::parser::{CommandLineOptions, ParseResult};
use crate::registry::OptionProviderRegistry;
use crate::validator::{CommandLineValidator, ValidationOutcome};

/// Producer name used when the handler writes to the output device
pub const HANDLER_PRODUCER: &str = "CommandLineHandler";

/// Single-message output sink; call order is display order
#[async_trait]
pub trait OutputDevice: Send + Sync {
    async fn display(&self, producer: &str, data: &str);
}

/// Renders the full option help
#[async_trait]
pub trait HelpRenderer: Send + Sync {
    async fn render_help(&self, registry: &OptionProviderRegistry, output: &dyn OutputDevice);
}

/// Identity of the running module, used for usage banners
pub trait ModuleInfo: Send + Sync {
    fn current_module_path(&self) -> String;
}

/// [`ModuleInfo`] backed by the current executable
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessModuleInfo;

impl ModuleInfo for ProcessModuleInfo {
    fn current_module_path(&self) -> String {
        std::env::current_exe()
            .ok()
            .and_then(|path| file_name(&path))
            .unwrap_or_else(|| "testhost".to_string())
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Owns the provider registry and the parse result for one process run
#[derive(Debug, Clone)]
pub struct CommandLineHandler {
    registry: OptionProviderRegistry,
    parse_result: ParseResult,
}

impl CommandLineHandler {
    pub fn new(registry: OptionProviderRegistry, parse_result: ParseResult) -> Self {
        Self {
            registry,
            parse_result,
        }
    }

    pub fn registry(&self) -> &OptionProviderRegistry {
        &self.registry
    }

    pub fn parse_result(&self) -> &ParseResult {
        &self.parse_result
    }

    /// Validate the command line, displaying exactly one diagnostic block on
    /// failure. When the validator asks for help (unknown options), the option
    /// help is rendered after the diagnostic.
    pub async fn parse_and_validate(
        &self,
        output: &dyn OutputDevice,
        help: &dyn HelpRenderer,
    ) -> bool {
        let (outcome, help_requested) = self.run_validator().await;
        if outcome.is_valid() {
            return true;
        }

        output.display(HANDLER_PRODUCER, outcome.message()).await;

        if help_requested {
            help.render_help(&self.registry, output).await;
        }

        false
    }

    /// Run the validator without producing output
    pub async fn validate(&self) -> ValidationOutcome {
        self.run_validator().await.0
    }

    async fn run_validator(&self) -> (ValidationOutcome, bool) {
        let mut help_requested = false;
        let outcome = CommandLineValidator::new(&self.registry, &self.parse_result)
            .validate(|| help_requested = true)
            .await;

        if !outcome.is_valid() {
            tracing::warn!(
                target: "command_line",
                stage = ?outcome.failed_stage,
                help_requested,
                "Command line rejected"
            );
        }

        (outcome, help_requested)
    }
}

impl CommandLineOptions for CommandLineHandler {
    fn is_option_set(&self, name: &str) -> bool {
        self.parse_result.is_option_set(name)
    }

    fn option_arguments(&self, name: &str) -> Option<Vec<String>> {
        self.parse_result.option_arguments(name)
    }
}
