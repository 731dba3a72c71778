use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::context::ModePolicy;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the cluster-management HTTP interface.
    pub endpoint: String,
    /// Polling period, read once when polling starts.
    pub refresh_interval_ms: u64,
    pub request_timeout_ms: u64,
    /// Treat malformed snapshots as errors instead of skipping them.
    pub strict_snapshots: bool,
    /// How `legacy` / `ring_not_ready` react to later snapshots.
    pub mode_policy: ModePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8098".into(),
            refresh_interval_ms: 1000,
            request_timeout_ms: 5000,
            strict_snapshots: false,
            mode_policy: ModePolicy::Reset,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("ringwatch.toml"))
            .merge(Json::file("ringwatch.json"))
            .merge(Env::prefixed("RINGWATCH_"))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            anyhow::bail!("Invalid endpoint {:?}: expected an http(s) URL", self.endpoint);
        }
        if self.refresh_interval_ms == 0 {
            anyhow::bail!("refresh_interval_ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
