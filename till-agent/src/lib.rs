//! # till-agent
//!
//! Process glue for the till printing stack: environment configuration,
//! logging, and a one-shot job that renders a receipt and delivers it.

pub mod config;
pub mod job;
pub mod logger;

pub use config::{Config, ConfigError, ConfigResult, DataKind};
pub use job::{Record, run};
pub use logger::{LogConfig, init_logger};

/// Load `.env` and start logging
///
/// Must run before [`Config::from_env`] so `.env` values are visible.
pub fn setup_environment() -> anyhow::Result<()> {
    if let Err(e) = dotenv::dotenv() {
        // a missing .env is normal in production
        if !e.not_found() {
            return Err(anyhow::anyhow!("failed to load .env: {e}"));
        }
    }

    let log = LogConfig::from_env();
    init_logger(&log.level, log.json, log.dir.as_deref())
}
