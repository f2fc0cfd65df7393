use std::{env, time::Duration};

use log::*;
use network_tools::TransitConfig;
use settlement_engine::{db::sqlite::db_url, CommissionPolicy, ProviderSettings};
use stl_common::helpers::parse_boolean_flag;

use crate::errors::ConfigError;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// `None` when no key service is configured
    pub transit: Option<TransitConfig>,
    pub providers: ProviderSettings,
    pub commission: CommissionPolicy,
    /// How often the watcher polls open push payments
    pub watch_interval: Duration,
    /// If false, the watcher waits one full interval before its first pass.
    pub reconcile_on_start: bool,
}

impl AppConfig {
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        let max_connections = match env::var("STL_DATABASE_MAX_CONNECTIONS") {
            Ok(s) => s.parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                name: "STL_DATABASE_MAX_CONNECTIONS",
                value: s.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };
        let watch_interval = match env::var("STL_WATCH_INTERVAL_SECS") {
            Ok(s) => s
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::InvalidValue {
                    name: "STL_WATCH_INTERVAL_SECS",
                    value: s.clone(),
                    reason: "Expected a positive number of seconds".into(),
                })?,
            Err(_) => DEFAULT_WATCH_INTERVAL,
        };
        let transit = TransitConfig::from_env();
        if transit.is_none() {
            warn!("🪛️ STL_TRANSIT_ADDR is not set. Tenant credentials cannot be encrypted or revealed.");
        }
        Ok(Self {
            database_url: db_url(),
            max_connections,
            transit,
            providers: ProviderSettings::new_from_env_or_default(),
            commission: CommissionPolicy::new_from_env_or_default(),
            watch_interval,
            reconcile_on_start: parse_boolean_flag(env::var("STL_RECONCILE_ON_START").ok(), true),
        })
    }
}
