//! `testhost validate`: check a command line against the declared options

use anyhow::{Context, Result};
use std::sync::Arc;
use testhost_config::{ExtensionConfig, TestHostConfig};
use testhost_options::{
    ArgumentArity, CommandLineHandler, CommandLineOption, CommandLineParser, HelpRenderer,
    OptionProviderRegistry, OutputDevice, PlatformOptionsProvider, ProviderMetadata,
    SharedProvider, StaticOptionsProvider,
};

/// Platform provider as the only system provider, plus one extension
/// provider per configured extension
pub fn build_registry(config: &TestHostConfig) -> Result<OptionProviderRegistry> {
    let platform: SharedProvider =
        Arc::new(PlatformOptionsProvider::new().context("Failed to build platform options")?);

    let extensions = config
        .extensions
        .iter()
        .map(extension_provider)
        .collect::<Result<Vec<_>>>()?;

    let registry = OptionProviderRegistry::new(vec![platform], extensions);
    tracing::debug!(
        target: "command_line",
        stats = ?registry.stats(),
        "Option providers registered"
    );
    Ok(registry)
}

fn extension_provider(extension: &ExtensionConfig) -> Result<SharedProvider> {
    let metadata = ProviderMetadata::new(
        &extension.uid,
        &extension.display_name,
        &extension.version,
        &extension.description,
    )?;

    let options = extension
        .options
        .iter()
        .map(|option| {
            let arity = ArgumentArity::new(
                option.min_arity,
                option.max_arity.unwrap_or(ArgumentArity::UNBOUNDED),
            )?;
            CommandLineOption::new(&option.name, &option.description, arity, option.hidden)
        })
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid option declared by extension '{}'", extension.uid))?;

    let provider = StaticOptionsProvider::new(metadata, options);
    Ok(match &extension.tool {
        Some(tool) => provider.for_tool(tool).into_shared(),
        None => provider.into_shared(),
    })
}

/// Tokenize and validate `args`; `false` means a diagnostic was displayed
pub async fn validate_command(
    registry: OptionProviderRegistry,
    args: &[String],
    output: &dyn OutputDevice,
    help: &dyn HelpRenderer,
) -> bool {
    let parse_result = CommandLineParser::new().parse(args);
    let handler = CommandLineHandler::new(registry, parse_result);
    handler.parse_and_validate(output, help).await
}
