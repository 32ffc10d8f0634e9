mod config;

pub use config::{ConfigError, TrystConfig};
