//! Built-in options owned by the test host platform

use async_trait::async_trait;

use crate::error::OptionResult;
use crate::parser::CommandLineOptions;
use crate::provider::{CommandLineOptionsProvider, ProviderMetadata};
use crate::types::{ArgumentArity, CommandLineOption, ValidationResult};

pub const HELP: &str = "help";
pub const INFO: &str = "info";
pub const DIAGNOSTIC: &str = "diagnostic";
pub const DIAGNOSTIC_OUTPUT_DIRECTORY: &str = "diagnostic-output-directory";
pub const DIAGNOSTIC_VERBOSITY: &str = "diagnostic-verbosity";
pub const RESULTS_DIRECTORY: &str = "results-directory";
pub const TIMEOUT: &str = "timeout";
pub const MINIMUM_EXPECTED_TESTS: &str = "minimum-expected-tests";
pub const LIST_TESTS: &str = "list-tests";
pub const EXIT_ON_PROCESS_EXIT: &str = "exit-on-process-exit";
pub const SERVER: &str = "server";
pub const CLIENT_PORT: &str = "client-port";
pub const TESTHOST_CONTROLLER_PID: &str = "internal-testhostcontroller-pid";

const VERBOSITY_LEVELS: [&str; 6] = [
    "Trace",
    "Debug",
    "Information",
    "Warning",
    "Error",
    "Critical",
];

/// System provider declaring the platform's own options
#[derive(Debug, Clone)]
pub struct PlatformOptionsProvider {
    metadata: ProviderMetadata,
    options: Vec<CommandLineOption>,
}

impl PlatformOptionsProvider {
    pub fn new() -> OptionResult<Self> {
        let metadata = ProviderMetadata::new(
            "PlatformCommandLineProvider",
            "Platform command line provider",
            env!("CARGO_PKG_VERSION"),
            "Options owned by the test host platform",
        )?;

        let declarations: [(&str, &str, ArgumentArity, bool); 13] = [
            (HELP, "Show the command line help.", ArgumentArity::ZERO, false),
            (INFO, "Display information about the test host.", ArgumentArity::ZERO, false),
            (DIAGNOSTIC, "Enable the diagnostic logging.", ArgumentArity::ZERO, false),
            (
                DIAGNOSTIC_OUTPUT_DIRECTORY,
                "Output directory of the diagnostic logging.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                DIAGNOSTIC_VERBOSITY,
                "Verbosity of the diagnostic logging: Trace, Debug, Information, Warning, Error or Critical.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                RESULTS_DIRECTORY,
                "Directory where test results are written.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                TIMEOUT,
                "Global test execution timeout, as <value>[h|m|s].",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                MINIMUM_EXPECTED_TESTS,
                "Minimum number of tests expected to run.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (LIST_TESTS, "List available tests.", ArgumentArity::ZERO, false),
            (
                EXIT_ON_PROCESS_EXIT,
                "Exit the test host when the process with the given PID exits.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                SERVER,
                "Run in server mode, optionally naming the protocol.",
                ArgumentArity::ZERO_OR_ONE,
                false,
            ),
            (
                CLIENT_PORT,
                "Port of the controller to connect to in server mode.",
                ArgumentArity::EXACTLY_ONE,
                false,
            ),
            (
                TESTHOST_CONTROLLER_PID,
                "PID of the test host controller.",
                ArgumentArity::EXACTLY_ONE,
                true,
            ),
        ];

        let options = declarations
            .into_iter()
            .map(|(name, description, arity, hidden)| {
                CommandLineOption::built_in(name, description, arity, hidden)
            })
            .collect::<OptionResult<Vec<_>>>()?;

        Ok(Self { metadata, options })
    }
}

#[async_trait]
impl CommandLineOptionsProvider for PlatformOptionsProvider {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn options(&self) -> &[CommandLineOption] {
        &self.options
    }

    async fn validate_option_arguments(
        &self,
        option: &CommandLineOption,
        arguments: &[String],
    ) -> ValidationResult {
        let Some(value) = arguments.first() else {
            return ValidationResult::valid();
        };

        match option.name() {
            TIMEOUT if !is_valid_timeout(value) => ValidationResult::invalid(format!(
                "'{}' is not a valid timeout, expected <value>[h|m|s] such as 1.5h or 90s",
                value
            )),
            MINIMUM_EXPECTED_TESTS if !value.parse::<u32>().is_ok_and(|count| count > 0) => {
                ValidationResult::invalid(format!("'{}' is not a positive integer", value))
            }
            DIAGNOSTIC_VERBOSITY
                if !VERBOSITY_LEVELS
                    .iter()
                    .any(|level| level.eq_ignore_ascii_case(value)) =>
            {
                ValidationResult::invalid(format!(
                    "'{}' is not a valid verbosity, expected one of: {}",
                    value,
                    VERBOSITY_LEVELS.join(", ")
                ))
            }
            EXIT_ON_PROCESS_EXIT | TESTHOST_CONTROLLER_PID if value.parse::<u32>().is_err() => {
                ValidationResult::invalid(format!("'{}' is not a valid process id", value))
            }
            CLIENT_PORT if value.parse::<u16>().is_err() => {
                ValidationResult::invalid(format!("'{}' is not a valid port", value))
            }
            _ => ValidationResult::valid(),
        }
    }

    async fn validate_configuration(&self, options: &dyn CommandLineOptions) -> ValidationResult {
        let mut errors = Vec::new();

        for dependent in [DIAGNOSTIC_OUTPUT_DIRECTORY, DIAGNOSTIC_VERBOSITY] {
            if options.is_option_set(dependent) && !options.is_option_set(DIAGNOSTIC) {
                errors.push(format!(
                    "'--{}' requires '--{}' to be provided",
                    dependent, DIAGNOSTIC
                ));
            }
        }

        if options.is_option_set(LIST_TESTS) && options.is_option_set(MINIMUM_EXPECTED_TESTS) {
            errors.push(format!(
                "'--{}' and '--{}' are incompatible",
                LIST_TESTS, MINIMUM_EXPECTED_TESTS
            ));
        }

        if options.is_option_set(CLIENT_PORT) && !options.is_option_set(SERVER) {
            errors.push(format!(
                "'--{}' requires '--{}' to be provided",
                CLIENT_PORT, SERVER
            ));
        }

        if errors.is_empty() {
            ValidationResult::valid()
        } else {
            ValidationResult::invalid(errors.join("\n"))
        }
    }
}

fn is_valid_timeout(value: &str) -> bool {
    let Some(unit) = value.chars().last() else {
        return false;
    };
    if !matches!(unit.to_ascii_lowercase(), 'h' | 'm' | 's') {
        return false;
    }

    value[..value.len() - 1]
        .parse::<f64>()
        .is_ok_and(|amount| amount.is_finite() && amount > 0.0)
}
