//! Option provider registry merging system and extension providers

use std::sync::Arc;

use crate::parser::strip_dashes;
use crate::provider::{CommandLineOptionsProvider, SharedProvider};
use crate::types::CommandLineOption;

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of system providers
    pub system_providers: usize,
    /// Number of extension providers
    pub extension_providers: usize,
    /// Number of tool-scoped providers across both origins
    pub tool_providers: usize,
    /// Total number of declared options
    pub total_options: usize,
}

/// Read-only view over the system and extension providers.
///
/// Neither input is ever mutated. Conflicting declarations are kept as-is and
/// reported by the validator rather than resolved here.
#[derive(Clone, Default)]
pub struct OptionProviderRegistry {
    system: Vec<SharedProvider>,
    extensions: Vec<SharedProvider>,
}

impl OptionProviderRegistry {
    /// Create a registry from the two provider origins, extension order being
    /// registration order
    pub fn new(system: Vec<SharedProvider>, extensions: Vec<SharedProvider>) -> Self {
        tracing::debug!(
            target: "option_registry",
            system = system.len(),
            extensions = extensions.len(),
            "Option provider registry created"
        );
        Self { system, extensions }
    }

    pub fn system_providers(&self) -> &[SharedProvider] {
        &self.system
    }

    pub fn extension_providers(&self) -> &[SharedProvider] {
        &self.extensions
    }

    /// System providers followed by extension providers
    pub fn all_providers(&self) -> impl Iterator<Item = &SharedProvider> {
        self.system.iter().chain(self.extensions.iter())
    }

    /// Every provider (system or extension) declaring the option
    pub fn find_providers_by_option_name(&self, name: &str) -> Vec<SharedProvider> {
        let name = strip_dashes(name);
        self.all_providers()
            .filter(|provider| provider.find_option(name).is_some())
            .cloned()
            .collect()
    }

    /// Extension providers declaring the option
    pub fn find_extension_providers_by_option_name(&self, name: &str) -> Vec<SharedProvider> {
        let name = strip_dashes(name);
        self.extensions
            .iter()
            .filter(|provider| provider.find_option(name).is_some())
            .cloned()
            .collect()
    }

    /// First provider declaring the option, together with the declaration
    pub fn find_option(&self, name: &str) -> Option<(&SharedProvider, &CommandLineOption)> {
        let name = strip_dashes(name);
        self.all_providers()
            .find_map(|provider| provider.find_option(name).map(|option| (provider, option)))
    }

    pub fn is_option_declared(&self, name: &str) -> bool {
        self.find_option(name).is_some()
    }

    /// Registry restricted to the providers visible for the invoked tool.
    ///
    /// Global providers are always kept; tool providers only when their tool
    /// is the one invoked.
    pub fn scoped(&self, tool_name: Option<&str>) -> Self {
        let keep = |provider: &&SharedProvider| provider.scope().is_active_for(tool_name);
        Self {
            system: self.system.iter().filter(keep).cloned().collect(),
            extensions: self.extensions.iter().filter(keep).cloned().collect(),
        }
    }

    /// Get registry statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            system_providers: self.system.len(),
            extension_providers: self.extensions.len(),
            tool_providers: self
                .all_providers()
                .filter(|provider| provider.scope().is_tool())
                .count(),
            total_options: self
                .all_providers()
                .map(|provider| provider.options().len())
                .sum(),
        }
    }
}

impl std::fmt::Debug for OptionProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let uids = |providers: &[SharedProvider]| -> Vec<String> {
            providers
                .iter()
                .map(|provider| provider.metadata().uid.clone())
                .collect()
        };
        f.debug_struct("OptionProviderRegistry")
            .field("system", &uids(&self.system))
            .field("extensions", &uids(&self.extensions))
            .finish()
    }
}

/// Identity comparison for shared providers
pub fn same_provider(a: &SharedProvider, b: &SharedProvider) -> bool {
    Arc::ptr_eq(a, b)
}

/// Display form used in diagnostics: `Name (UID: uid)`
pub fn provider_label(provider: &dyn CommandLineOptionsProvider) -> String {
    let metadata = provider.metadata();
    format!("{} (UID: {})", metadata.display_name, metadata.uid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderMetadata, StaticOptionsProvider};
    use crate::types::ArgumentArity;

    fn provider(uid: &str, options: &[&str]) -> StaticOptionsProvider {
        StaticOptionsProvider::new(
            ProviderMetadata::new(uid, uid.to_uppercase(), "1.0.0", "test provider").unwrap(),
            options
                .iter()
                .map(|name| {
                    CommandLineOption::new(*name, "description", ArgumentArity::ZERO, false)
                        .unwrap()
                })
                .collect(),
        )
    }

    fn registry() -> OptionProviderRegistry {
        OptionProviderRegistry::new(
            vec![provider("platform", &["help", "info"]).into_shared()],
            vec![
                provider("a", &["retries", "help"]).into_shared(),
                provider("b", &["retries"]).into_shared(),
                provider("merge", &["output"]).for_tool("merge").into_shared(),
            ],
        )
    }

    #[test]
    fn test_find_providers_by_option_name() {
        let registry = registry();

        let uids = |providers: Vec<SharedProvider>| -> Vec<String> {
            providers
                .iter()
                .map(|provider| provider.metadata().uid.clone())
                .collect()
        };

        assert_eq!(
            uids(registry.find_providers_by_option_name("--help")),
            vec!["platform", "a"]
        );
        assert_eq!(
            uids(registry.find_extension_providers_by_option_name("help")),
            vec!["a"]
        );
        assert_eq!(
            uids(registry.find_extension_providers_by_option_name("retries")),
            vec!["a", "b"]
        );
        assert!(registry.find_providers_by_option_name("missing").is_empty());
    }

    #[test]
    fn test_find_option_prefers_system() {
        let registry = registry();
        let (provider, option) = registry.find_option("help").unwrap();
        assert_eq!(provider.metadata().uid, "platform");
        assert_eq!(option.name(), "help");
        assert!(registry.is_option_declared("-info"));
        assert!(!registry.is_option_declared("nope"));
    }

    #[test]
    fn test_scoped_registry() {
        let registry = registry();

        let global = registry.scoped(None);
        assert_eq!(global.extension_providers().len(), 2);
        assert!(!global.is_option_declared("output"));

        let merge = registry.scoped(Some("merge"));
        assert_eq!(merge.extension_providers().len(), 3);
        assert!(merge.is_option_declared("output"));

        // the source registry is untouched
        assert_eq!(registry.extension_providers().len(), 3);
    }

    #[test]
    fn test_registry_stats() {
        let stats = registry().stats();
        assert_eq!(
            stats,
            RegistryStats {
                system_providers: 1,
                extension_providers: 3,
                tool_providers: 1,
                total_options: 6,
            }
        );
    }

    #[test]
    fn test_provider_label_and_identity() {
        let registry = registry();
        let first = &registry.extension_providers()[0];
        assert_eq!(provider_label(first.as_ref()), "A (UID: a)");
        assert!(same_provider(first, &registry.find_option("retries").unwrap().0.clone()));
    }
}
