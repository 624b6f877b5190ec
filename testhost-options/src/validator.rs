//! Command-line validation pipeline
//!
//! The checks run in a fixed order and the first failing check ends the run.
//! Every check batches all violations of its own kind into one multi-line
//! diagnostic, so exactly one diagnostic block is produced per failed run.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::parser::{strip_dashes, ParseResult};
use crate::provider::SharedProvider;
use crate::registry::{provider_label, same_provider, OptionProviderRegistry};
use crate::types::ValidationResult;

/// Prefix reserved for platform-internal options
pub const RESERVED_PREFIX: &str = "internal";

/// Header of the tokenizer error block
pub const PARSE_ERRORS_HEADER: &str = "Invalid command line arguments:";

/// Remediation hint following duplicate extension options
pub const DUPLICATE_OPTION_HINT: &str =
    "You can fix the previous option clash by overriding the option name using the configuration file";

/// Validation checks, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStage {
    ParseErrors,
    ReservedPrefix,
    ReservedOptions,
    DuplicateExtensionOptions,
    UnknownOptions,
    Arity,
    OptionArguments,
    Configuration,
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ParseErrors => "parse_errors",
            Self::ReservedPrefix => "reserved_prefix",
            Self::ReservedOptions => "reserved_options",
            Self::DuplicateExtensionOptions => "duplicate_extension_options",
            Self::UnknownOptions => "unknown_options",
            Self::Arity => "arity",
            Self::OptionArguments => "option_arguments",
            Self::Configuration => "configuration",
        };
        write!(f, "{}", name)
    }
}

/// Result of a full validation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Check that failed, `None` on success
    pub failed_stage: Option<ValidationStage>,
    pub result: ValidationResult,
}

impl ValidationOutcome {
    fn passed() -> Self {
        Self {
            failed_stage: None,
            result: ValidationResult::valid(),
        }
    }

    fn failed(stage: ValidationStage, result: ValidationResult) -> Self {
        Self {
            failed_stage: Some(stage),
            result,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.result.is_valid
    }

    /// Diagnostic block, empty on success
    pub fn message(&self) -> &str {
        self.result.message()
    }
}

/// Runs the validation pipeline over a registry and a parse result
pub struct CommandLineValidator<'a> {
    registry: &'a OptionProviderRegistry,
    parse_result: &'a ParseResult,
}

impl<'a> CommandLineValidator<'a> {
    pub fn new(registry: &'a OptionProviderRegistry, parse_result: &'a ParseResult) -> Self {
        Self {
            registry,
            parse_result,
        }
    }

    /// Run every check in order, stopping at the first failure.
    ///
    /// `on_unknown_option` is invoked once when the unknown-option check
    /// fails, so callers can render the option help.
    pub async fn validate<F>(&self, on_unknown_option: F) -> ValidationOutcome
    where
        F: FnOnce() + Send,
    {
        let scoped = self.registry.scoped(self.parse_result.tool_name());
        let parse_result = self.parse_result;

        let parse_errors = check_parse_errors(parse_result);
        if !parse_errors.is_valid {
            return self.fail(ValidationStage::ParseErrors, parse_errors);
        }

        let reserved_prefix = check_reserved_prefix(self.registry);
        if !reserved_prefix.is_valid {
            return self.fail(ValidationStage::ReservedPrefix, reserved_prefix);
        }

        let reserved_options = check_reserved_options(&scoped);
        if !reserved_options.is_valid {
            return self.fail(ValidationStage::ReservedOptions, reserved_options);
        }

        let duplicates = check_duplicate_extension_options(&scoped);
        if !duplicates.is_valid {
            return self.fail(ValidationStage::DuplicateExtensionOptions, duplicates);
        }

        let unknown = check_unknown_options(&scoped, parse_result);
        if !unknown.is_valid {
            on_unknown_option();
            return self.fail(ValidationStage::UnknownOptions, unknown);
        }

        let arity = check_arity(&scoped, parse_result);
        if !arity.is_valid {
            return self.fail(ValidationStage::Arity, arity);
        }

        let arguments = check_option_arguments(&scoped, parse_result).await;
        if !arguments.is_valid {
            return self.fail(ValidationStage::OptionArguments, arguments);
        }

        let configuration = check_configuration(&scoped, parse_result).await;
        if !configuration.is_valid {
            return self.fail(ValidationStage::Configuration, configuration);
        }

        tracing::debug!(target: "command_line", "Command line validated");
        ValidationOutcome::passed()
    }

    fn fail(&self, stage: ValidationStage, result: ValidationResult) -> ValidationOutcome {
        tracing::debug!(
            target: "command_line",
            stage = %stage,
            "Command line validation failed"
        );
        ValidationOutcome::failed(stage, result)
    }
}

/// Surface every tokenizer error under a fixed header
pub fn check_parse_errors(parse_result: &ParseResult) -> ValidationResult {
    if !parse_result.has_error() {
        return ValidationResult::valid();
    }

    let mut lines = vec![PARSE_ERRORS_HEADER.to_string()];
    lines.extend(parse_result.errors.iter().map(|error| format!("\t- {}", error)));
    ValidationResult::from_lines(lines)
}

/// Extensions may not declare options in the reserved `internal` namespace
pub fn check_reserved_prefix(registry: &OptionProviderRegistry) -> ValidationResult {
    let mut lines = Vec::new();

    for provider in registry.extension_providers() {
        for option in provider.options() {
            if option.is_built_in() {
                continue;
            }
            if starts_with_reserved_prefix(option.name()) {
                lines.push(format!(
                    "Option '--{}' from provider '{}' is using the reserved prefix '--{}'",
                    option.name(),
                    provider_label(provider.as_ref()),
                    RESERVED_PREFIX
                ));
            }
        }
    }

    ValidationResult::from_lines(lines)
}

fn starts_with_reserved_prefix(name: &str) -> bool {
    strip_dashes(name)
        .get(..RESERVED_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(RESERVED_PREFIX))
}

/// Extensions may not redefine an option declared by a system provider
pub fn check_reserved_options(registry: &OptionProviderRegistry) -> ValidationResult {
    let system_names = distinct_option_names(registry.system_providers());
    let extension_names = distinct_option_names(registry.extension_providers());

    let lines = system_names
        .intersection(&extension_names)
        .map(|name| {
            let providers = registry.find_extension_providers_by_option_name(name);
            format!(
                "Option '--{}' is reserved and cannot be used by providers: {}",
                name,
                join_labels(&providers)
            )
        })
        .collect();

    ValidationResult::from_lines(lines)
}

/// The same option may not be declared by two different extensions
pub fn check_duplicate_extension_options(registry: &OptionProviderRegistry) -> ValidationResult {
    let mut declarations: BTreeMap<&str, Vec<SharedProvider>> = BTreeMap::new();

    for provider in registry.extension_providers() {
        for option in provider.options() {
            let owners = declarations.entry(option.name()).or_default();
            if !owners.iter().any(|owner| same_provider(owner, provider)) {
                owners.push(provider.clone());
            }
        }
    }

    let mut lines: Vec<String> = declarations
        .into_iter()
        .filter(|(_, owners)| owners.len() > 1)
        .map(|(name, owners)| {
            format!(
                "Option '--{}' is declared by multiple extensions: {}",
                name,
                join_labels(&owners)
            )
        })
        .collect();

    if !lines.is_empty() {
        lines.push(DUPLICATE_OPTION_HINT.to_string());
    }

    ValidationResult::from_lines(lines)
}

/// Every parsed option must be declared by some provider
pub fn check_unknown_options(
    registry: &OptionProviderRegistry,
    parse_result: &ParseResult,
) -> ValidationResult {
    let lines = parse_result
        .distinct_option_names()
        .into_iter()
        .filter(|name| !registry.is_option_declared(name))
        .map(|name| format!("Unknown option '--{}'", name))
        .collect();

    ValidationResult::from_lines(lines)
}

/// Argument counts, summed across repeated occurrences, must fit the arity
pub fn check_arity(
    registry: &OptionProviderRegistry,
    parse_result: &ParseResult,
) -> ValidationResult {
    let mut lines = Vec::new();

    for name in parse_result.distinct_option_names() {
        let Some((provider, option)) = registry.find_option(name) else {
            continue;
        };

        let observed: usize = parse_result
            .records_for(name)
            .map(|record| record.arguments.len())
            .sum();
        let arity = option.arity();
        let label = provider_label(provider.as_ref());

        if arity.max() == 0 && observed > 0 {
            lines.push(format!(
                "Option '--{}' from provider '{}' expects 0 argument",
                name, label
            ));
        } else if observed < arity.min() as usize {
            lines.push(format!(
                "Option '--{}' from provider '{}' expects at least {} argument(s)",
                name,
                label,
                arity.min()
            ));
        } else if !arity.is_unbounded() && observed > arity.max() as usize {
            lines.push(format!(
                "Option '--{}' from provider '{}' expects at most {} argument(s)",
                name,
                label,
                arity.max()
            ));
        }
    }

    ValidationResult::from_lines(lines)
}

/// Delegate each occurrence's values to the owning provider
pub async fn check_option_arguments(
    registry: &OptionProviderRegistry,
    parse_result: &ParseResult,
) -> ValidationResult {
    let mut lines = Vec::new();

    for record in &parse_result.options {
        let Some((provider, option)) = registry.find_option(&record.option) else {
            continue;
        };

        let result = provider
            .validate_option_arguments(option, &record.arguments)
            .await;
        if !result.is_valid {
            lines.push(format!("--{}: {}", record.option, result.message()));
        }
    }

    ValidationResult::from_lines(lines)
}

/// Run every provider's cross-option checks
pub async fn check_configuration(
    registry: &OptionProviderRegistry,
    parse_result: &ParseResult,
) -> ValidationResult {
    let mut lines = Vec::new();

    for provider in registry.all_providers() {
        let result = provider.validate_configuration(parse_result).await;
        if result.is_valid {
            continue;
        }

        lines.push(format!(
            "Invalid configuration for provider '{}':",
            provider_label(provider.as_ref())
        ));
        lines.extend(
            result
                .message()
                .lines()
                .map(|line| format!("\t- {}", line)),
        );
    }

    ValidationResult::from_lines(lines)
}

fn distinct_option_names(providers: &[SharedProvider]) -> BTreeSet<String> {
    providers
        .iter()
        .flat_map(|provider| provider.options().iter())
        .map(|option| option.name().to_string())
        .collect()
}

fn join_labels(providers: &[SharedProvider]) -> String {
    providers
        .iter()
        .map(|provider| format!("'{}'", provider_label(provider.as_ref())))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CommandLineOptionsProvider, ProviderMetadata, StaticOptionsProvider};
    use crate::parser::{CommandLineOptions, OptionRecord};
    use crate::types::{ArgumentArity, CommandLineOption};
    use async_trait::async_trait;

    fn option(name: &str, arity: ArgumentArity) -> CommandLineOption {
        CommandLineOption::new(name, "description", arity, false).unwrap()
    }

    fn provider(uid: &str, options: Vec<CommandLineOption>) -> SharedProvider {
        StaticOptionsProvider::new(
            ProviderMetadata::new(uid, uid.to_uppercase(), "1.0.0", "test").unwrap(),
            options,
        )
        .into_shared()
    }

    fn platform() -> SharedProvider {
        provider(
            "platform",
            vec![
                CommandLineOption::built_in("help", "Show help", ArgumentArity::ZERO, false)
                    .unwrap(),
            ],
        )
    }

    #[test]
    fn test_reserved_prefix_boundaries() {
        assert!(starts_with_reserved_prefix("internal-foo"));
        assert!(starts_with_reserved_prefix("--internal-foo"));
        assert!(starts_with_reserved_prefix("InTeRnAl"));
        assert!(starts_with_reserved_prefix("internationalize"));
        assert!(!starts_with_reserved_prefix("intern"));
        assert!(!starts_with_reserved_prefix("my-internal"));
    }

    #[test]
    fn test_reserved_prefix_ignores_system_and_built_in() {
        let system = provider(
            "platform",
            vec![option("internal-pid", ArgumentArity::EXACTLY_ONE)],
        );
        let extension = provider(
            "ext",
            vec![
                CommandLineOption::built_in("internal-x", "d", ArgumentArity::ZERO, false)
                    .unwrap(),
            ],
        );
        let registry = OptionProviderRegistry::new(vec![system], vec![extension]);
        assert!(check_reserved_prefix(&registry).is_valid);
    }

    #[test]
    fn test_duplicate_options_group_distinct_providers() {
        let a = provider(
            "a",
            vec![
                option("retries", ArgumentArity::EXACTLY_ONE),
                option("retries", ArgumentArity::EXACTLY_ONE),
            ],
        );
        let registry = OptionProviderRegistry::new(vec![], vec![a.clone()]);
        assert!(check_duplicate_extension_options(&registry).is_valid);

        let b = provider("b", vec![option("retries", ArgumentArity::EXACTLY_ONE)]);
        let registry = OptionProviderRegistry::new(vec![], vec![a, b]);
        let result = check_duplicate_extension_options(&registry);
        assert_eq!(
            result.message(),
            format!(
                "Option '--retries' is declared by multiple extensions: 'A (UID: a)', 'B (UID: b)'\n{}",
                DUPLICATE_OPTION_HINT
            )
        );
    }

    #[test]
    fn test_arity_messages() {
        let registry = OptionProviderRegistry::new(
            vec![platform()],
            vec![provider(
                "a",
                vec![
                    option("x", ArgumentArity::EXACTLY_ONE),
                    option("many", ArgumentArity::ONE_OR_MORE),
                ],
            )],
        );

        let missing = ParseResult::new(vec![OptionRecord::new("x", Vec::<String>::new())]);
        assert!(check_arity(&registry, &missing)
            .message()
            .contains("expects at least 1 argument(s)"));

        let repeated = ParseResult::new(vec![
            OptionRecord::new("x", ["a"]),
            OptionRecord::new("x", ["b"]),
        ]);
        assert!(check_arity(&registry, &repeated)
            .message()
            .contains("expects at most 1 argument(s)"));

        let exact = ParseResult::new(vec![OptionRecord::new("x", ["a"])]);
        assert!(check_arity(&registry, &exact).is_valid);

        let unbounded = ParseResult::new(vec![OptionRecord::new("many", ["a", "b", "c"])]);
        assert!(check_arity(&registry, &unbounded).is_valid);

        let flag = ParseResult::new(vec![OptionRecord::new("help", ["oops"])]);
        assert_eq!(
            check_arity(&registry, &flag).message(),
            "Option '--help' from provider 'PLATFORM (UID: platform)' expects 0 argument"
        );
    }

    #[test]
    fn test_arity_collects_every_violation() {
        let registry = OptionProviderRegistry::new(
            vec![platform()],
            vec![provider("a", vec![option("x", ArgumentArity::EXACTLY_ONE)])],
        );
        let parse = ParseResult::new(vec![
            OptionRecord::new("help", ["a"]),
            OptionRecord::new("x", Vec::<String>::new()),
        ]);

        let result = check_arity(&registry, &parse);
        assert_eq!(result.message().lines().count(), 2);
    }

    struct RejectingProvider {
        metadata: ProviderMetadata,
        options: Vec<CommandLineOption>,
    }

    #[async_trait]
    impl CommandLineOptionsProvider for RejectingProvider {
        fn metadata(&self) -> &ProviderMetadata {
            &self.metadata
        }

        fn options(&self) -> &[CommandLineOption] {
            &self.options
        }

        async fn validate_option_arguments(
            &self,
            _option: &CommandLineOption,
            arguments: &[String],
        ) -> ValidationResult {
            if arguments.iter().all(|arg| arg.parse::<u32>().is_ok()) {
                ValidationResult::valid()
            } else {
                ValidationResult::invalid("expects a number")
            }
        }

        async fn validate_configuration(
            &self,
            options: &dyn CommandLineOptions,
        ) -> ValidationResult {
            if options.is_option_set("forbidden") {
                ValidationResult::invalid("'--forbidden' is not allowed\nremove it")
            } else {
                ValidationResult::valid()
            }
        }
    }

    fn rejecting() -> SharedProvider {
        std::sync::Arc::new(RejectingProvider {
            metadata: ProviderMetadata::new("num", "Numbers", "1.0.0", "test").unwrap(),
            options: vec![
                option("count", ArgumentArity::ZERO_OR_MORE),
                option("forbidden", ArgumentArity::ZERO),
            ],
        })
    }

    #[tokio::test]
    async fn test_option_arguments_per_record() {
        let registry = OptionProviderRegistry::new(vec![], vec![rejecting()]);
        let parse = ParseResult::new(vec![
            OptionRecord::new("count", ["1"]),
            OptionRecord::new("count", ["x"]),
            OptionRecord::new("count", ["y"]),
        ]);

        let result = check_option_arguments(&registry, &parse).await;
        assert_eq!(
            result.message(),
            "--count: expects a number\n--count: expects a number"
        );
    }

    #[tokio::test]
    async fn test_configuration_lines() {
        let registry = OptionProviderRegistry::new(vec![], vec![rejecting()]);
        let parse = ParseResult::new(vec![OptionRecord::new("forbidden", Vec::<String>::new())]);

        let result = check_configuration(&registry, &parse).await;
        assert_eq!(
            result.message(),
            "Invalid configuration for provider 'Numbers (UID: num)':\n\t- '--forbidden' is not allowed\n\t- remove it"
        );
    }

    #[tokio::test]
    async fn test_pipeline_short_circuits() {
        let registry = OptionProviderRegistry::new(
            vec![platform()],
            vec![provider("a", vec![option("internal-x", ArgumentArity::ZERO)])],
        );
        let parse = ParseResult::new(vec![OptionRecord::new("unknown", Vec::<String>::new())]);

        let mut help_requested = false;
        let outcome = CommandLineValidator::new(&registry, &parse)
            .validate(|| help_requested = true)
            .await;

        assert_eq!(outcome.failed_stage, Some(ValidationStage::ReservedPrefix));
        assert!(!help_requested);
    }
}
