//! [`StoreConfig`] – tunables for a [`ParamStore`][crate::ParamStore].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default wait before querying the registry.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(1);

/// Configuration of a [`ParamStore`][crate::ParamStore].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Time to wait before listing registry names on every load.  Registries
    /// that publish names asynchronously after start-up may need a longer
    /// wait.  [`Duration::ZERO`] skips the wait.
    #[serde(default = "default_grace_period")]
    pub grace_period: Duration,
}

fn default_grace_period() -> Duration {
    DEFAULT_GRACE_PERIOD
}

impl StoreConfig {
    /// A configuration that never waits before querying the registry.
    pub fn immediate() -> Self {
        Self {
            grace_period: Duration::ZERO,
        }
    }

    /// Replace the grace period.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}
