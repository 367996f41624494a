//! Allocation configuration.

use tracing::warn;

/// Environment variable overriding [`FulfillmentConfig::remove_empty_groups`].
pub const REMOVE_EMPTY_GROUPS_ENV: &str = "ALLOTMENT_REMOVE_EMPTY_GROUPS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FulfillmentConfig {
    /// Prune groups without allocations before reconciling in `verify`.
    remove_empty_groups: bool,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            remove_empty_groups: true,
        }
    }
}

impl FulfillmentConfig {
    /// Defaults, overridden by `ALLOTMENT_REMOVE_EMPTY_GROUPS` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(raw) = lookup(REMOVE_EMPTY_GROUPS_ENV) {
            match raw.trim().parse::<bool>() {
                Ok(value) => config.remove_empty_groups = value,
                Err(_) => warn!(
                    value = %raw,
                    "{REMOVE_EMPTY_GROUPS_ENV} is not a boolean; keeping default"
                ),
            }
        }
        config
    }

    pub fn with_remove_empty_groups(mut self, enabled: bool) -> Self {
        self.remove_empty_groups = enabled;
        self
    }

    pub fn remove_empty_groups(&self) -> bool {
        self.remove_empty_groups
    }

    pub fn set_remove_empty_groups(&mut self, enabled: bool) {
        self.remove_empty_groups = enabled;
    }
}
