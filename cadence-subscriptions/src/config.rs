use chrono::Duration;
use serde::Deserialize;
use std::env;

/// Engine configuration. External and read-only to the processing core.
#[derive(Debug, Deserialize, Clone)]
pub struct SubscriptionsConfig {
    /// Gateway identifier payments are created against
    #[serde(default = "default_gateway")]
    pub default_gateway: String,
    /// How far to push an installment's actionable date after a failure
    #[serde(default = "default_reprocessing_interval_hours")]
    pub reprocessing_interval_hours: i64,
    /// Store assigned to consolidated orders when the subscription has none
    #[serde(default = "default_store")]
    pub fallback_store: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_gateway() -> String {
    "default".to_string()
}

fn default_reprocessing_interval_hours() -> i64 {
    24
}

fn default_store() -> String {
    "default".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for SubscriptionsConfig {
    fn default() -> Self {
        Self {
            default_gateway: default_gateway(),
            reprocessing_interval_hours: default_reprocessing_interval_hours(),
            fallback_store: default_store(),
            currency: default_currency(),
        }
    }
}

impl SubscriptionsConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CADENCE_FALLBACK_STORE=eu` sets the `fallback_store` key
            .add_source(config::Environment::with_prefix("CADENCE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn reprocessing_interval(&self) -> Duration {
        Duration::hours(self.reprocessing_interval_hours)
    }
}
