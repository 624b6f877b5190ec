//! Console output device and option help rendering

use async_trait::async_trait;
use testhost_options::{
    CommandLineOptionsProvider, HelpRenderer, ModuleInfo, OptionProviderRegistry, OutputDevice,
};

/// Producer name used for the rendered help
pub const HELP_PRODUCER: &str = "HelpRenderer";

/// Writes every message to stdout, in call order
#[derive(Debug, Default)]
pub struct ConsoleOutput;

#[async_trait]
impl OutputDevice for ConsoleOutput {
    async fn display(&self, producer: &str, data: &str) {
        tracing::trace!(target: "console", producer, "Displaying message");
        println!("{}", data);
    }
}

/// Renders the visible options of every provider
pub struct ConsoleHelp<M> {
    module: M,
}

impl<M: ModuleInfo> ConsoleHelp<M> {
    pub fn new(module: M) -> Self {
        Self { module }
    }

    pub fn render(&self, registry: &OptionProviderRegistry) -> String {
        let mut text = format!(
            "Usage {} [option providers] [extension option providers]\n",
            self.module.current_module_path()
        );

        text.push_str("\nOptions:\n");
        for provider in registry.system_providers() {
            push_options(&mut text, provider.as_ref());
        }

        let extensions: Vec<_> = registry
            .extension_providers()
            .iter()
            .filter(|provider| provider.options().iter().any(|option| !option.is_hidden()))
            .collect();

        if !extensions.is_empty() {
            text.push_str("\nExtension options:\n");
            for provider in extensions {
                let metadata = provider.metadata();
                text.push_str(&format!("  {} [{}]\n", metadata.display_name, metadata.uid));
                push_options(&mut text, provider.as_ref());
            }
        }

        text
    }
}

fn push_options(text: &mut String, provider: &dyn CommandLineOptionsProvider) {
    for option in provider.options().iter().filter(|option| !option.is_hidden()) {
        text.push_str(&format!("    --{:<32} {}\n", option.name(), option.description()));
    }
}

#[async_trait]
impl<M: ModuleInfo> HelpRenderer for ConsoleHelp<M> {
    async fn render_help(&self, registry: &OptionProviderRegistry, output: &dyn OutputDevice) {
        output.display(HELP_PRODUCER, &self.render(registry)).await;
    }
}
