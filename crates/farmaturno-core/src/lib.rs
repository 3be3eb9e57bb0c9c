//! Shared configuration and domain model for the on-duty pharmacy collector
//! and publisher.

pub mod app_config;
pub mod config;
pub mod pharmacy;
pub mod region;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, FetchBackend};
pub use config::{load_app_config, load_app_config_from_env};
pub use pharmacy::{Dataset, Pharmacy, PharmacyStub, RawField, SCHEDULE_KEY, SCHEDULE_NOT_SPECIFIED};
pub use region::{Region, RegionCode, REGIONS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid region code {0}: expected 1..=16")]
    InvalidRegionCode(u8),
}
