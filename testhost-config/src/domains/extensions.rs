//! Extension option providers declared in configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, Validatable};

/// An extension contributing command-line options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfig {
    /// Unique identifier
    pub uid: String,

    /// Name shown in diagnostics
    pub display_name: String,

    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Restrict the options to invocations of this tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    #[serde(default)]
    pub options: Vec<ExtensionOptionConfig>,
}

/// One declared option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionOptionConfig {
    pub name: String,

    pub description: String,

    #[serde(default)]
    pub min_arity: u32,

    /// Absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_arity: Option<u32>,

    #[serde(default = "crate::domains::utils::default_false")]
    pub hidden: bool,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Validatable for ExtensionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.uid, "uid", self.domain_name())?;
        validate_required_string(&self.display_name, "display_name", self.domain_name())?;

        if let Some(tool) = &self.tool {
            validate_required_string(tool, "tool", self.domain_name())?;
        }

        for option in &self.options {
            validate_required_string(&option.name, "option name", self.domain_name())?;
            validate_required_string(
                &option.description,
                "option description",
                self.domain_name(),
            )?;

            if let Some(max) = option.max_arity {
                if max < option.min_arity {
                    return Err(self.validation_error(format!(
                        "option '{}' of extension '{}' has max_arity {} below min_arity {}",
                        option.name, self.uid, max, option.min_arity
                    )));
                }
            }
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "extensions"
    }
}

/// Validate every extension and require unique uids
pub fn validate_extensions(extensions: &[ExtensionConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for extension in extensions {
        extension.validate()?;
        if !seen.insert(extension.uid.as_str()) {
            return Err(extension.validation_error(format!(
                "extension uid '{}' is declared more than once",
                extension.uid
            )));
        }
    }
    Ok(())
}
