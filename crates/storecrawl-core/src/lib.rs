pub mod checkpoint;
mod config;
pub mod output;
mod proxy_config;
mod retailers;
mod store;

use thiserror::Error;

pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointError};
pub use config::{
    build_proxy_config, load_proxy_config, load_proxy_config_from_env, parse_proxy_yaml,
    read_proxy_file, ProxyFileSection, ResidentialSection, ScraperApiSection,
};
pub use output::{save_to_csv, save_to_json, OutputError};
pub use proxy_config::{ProxyConfig, ProxyMode, SessionType};
pub use retailers::Retailer;
pub use store::{StoreRecord, DEFAULT_FIELDNAMES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    ConfigFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigFileParse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Validation(String),

    #[error("unknown retailer: {name}. Available: {available}")]
    UnknownRetailer { name: String, available: String },
}
