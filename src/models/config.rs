//! Configuration model loaded from external sources.

use serde::Deserialize;

use crate::domain::duplicates::DuplicateSettings;
use crate::domain::sla::SlaPolicy;

fn default_sweep_interval_secs() -> u64 {
    300
}

/// Pool size and pragmas for the SQLite database.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing.
    pub busy_timeout_ms: u64,
    pub write_ahead_log: bool,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout_ms: 30_000,
            write_ahead_log: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
/// Basic configuration shared across handlers and the sweep worker.
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub database_url: String,
    #[serde(default)]
    pub database: DatabaseSettings,
    /// HMAC secret used to verify bearer tokens.
    pub secret: String,
    /// Seconds between two SLA sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default)]
    pub sla: SlaPolicy,
    #[serde(default)]
    pub duplicates: DuplicateSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_settings_fill_missing_keys() {
        let settings: DatabaseSettings =
            serde_json::from_value(serde_json::json!({ "max_connections": 2 })).unwrap();

        assert_eq!(settings.max_connections, 2);
        assert_eq!(settings.busy_timeout_ms, 30_000);
        assert!(settings.write_ahead_log);
    }
}
