//! Command-line option providers and validation for the test host
//!
//! Option declarations are contributed by two kinds of providers: the
//! platform's own (system) providers and extension providers. The
//! [`CommandLineValidator`] checks those declarations against each other and
//! against a tokenized command line, producing a single diagnostic block on
//! failure.

pub mod error;
pub mod handler;
pub mod parser;
pub mod platform;
pub mod provider;
pub mod registry;
pub mod types;
pub mod validator;

// Re-export main types
pub use error::{OptionError, OptionResult};
pub use handler::{
    CommandLineHandler, HelpRenderer, ModuleInfo, OutputDevice, ProcessModuleInfo,
    HANDLER_PRODUCER,
};
pub use parser::{CommandLineOptions, CommandLineParser, OptionRecord, ParseResult};
pub use platform::PlatformOptionsProvider;
pub use provider::{
    CommandLineOptionsProvider, ProviderMetadata, SharedProvider, StaticOptionsProvider,
};
pub use registry::{OptionProviderRegistry, RegistryStats};
pub use types::{ArgumentArity, CommandLineOption, ProviderScope, ValidationResult};
pub use validator::{CommandLineValidator, ValidationOutcome, ValidationStage, RESERVED_PREFIX};
