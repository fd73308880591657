//! Generator configuration.
//!
//! Values come from CLI flags or environment variables, falling back to
//! defaults that match a single-node deployment (worker 1, datacenter 1).

use crate::defs::{
    DEFAULT_DATACENTER_ID, DEFAULT_SPIN_TIMEOUT, DEFAULT_WORKER_ID, SNOWFLAKE_ID_EPOCH,
};
use crate::error::ConfigError;
use crate::generator::GeneratorSettings;
use crate::SnowflakeGenerator;
use clap::Parser;
use std::time::Duration;

/// Identity and tuning of the process-wide generator.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "snowflake")]
pub struct SnowflakeConfig {
    /// Worker index of this instance
    ///
    /// Environment variable: `SNOWFLAKE_WORKER_ID`
    #[arg(long, env = "SNOWFLAKE_WORKER_ID", default_value_t = DEFAULT_WORKER_ID)]
    pub worker_id: u64,

    /// Datacenter index of this instance
    ///
    /// Environment variable: `SNOWFLAKE_DATACENTER_ID`
    #[arg(long, env = "SNOWFLAKE_DATACENTER_ID", default_value_t = DEFAULT_DATACENTER_ID)]
    pub datacenter_id: u64,

    /// Custom epoch, milliseconds since the Unix epoch
    ///
    /// Environment variable: `SNOWFLAKE_EPOCH`
    #[arg(long, env = "SNOWFLAKE_EPOCH", default_value_t = SNOWFLAKE_ID_EPOCH)]
    pub epoch: i64,

    /// Longest time an allocation may spin waiting for the next millisecond
    ///
    /// Environment variable: `SNOWFLAKE_SPIN_TIMEOUT_MS`
    #[arg(
        long,
        env = "SNOWFLAKE_SPIN_TIMEOUT_MS",
        default_value_t = DEFAULT_SPIN_TIMEOUT.as_millis() as u64
    )]
    pub spin_timeout_ms: u64,
}

impl SnowflakeConfig {
    /// Reads the configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::try_parse_from(["snowflake"]).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn settings(&self) -> GeneratorSettings {
        GeneratorSettings::builder()
            .worker_id(self.worker_id)
            .datacenter_id(self.datacenter_id)
            .epoch(self.epoch)
            .spin_timeout(Duration::from_millis(self.spin_timeout_ms))
            .build()
    }

    /// Validates the identity and builds the generator.
    pub fn build(&self) -> Result<SnowflakeGenerator, ConfigError> {
        SnowflakeGenerator::with_settings(self.settings())
    }
}

impl Default for SnowflakeConfig {
    fn default() -> Self {
        Self {
            worker_id: DEFAULT_WORKER_ID,
            datacenter_id: DEFAULT_DATACENTER_ID,
            epoch: SNOWFLAKE_ID_EPOCH,
            spin_timeout_ms: DEFAULT_SPIN_TIMEOUT.as_millis() as u64,
        }
    }
}
