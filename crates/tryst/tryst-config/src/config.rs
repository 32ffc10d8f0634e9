use serde::Deserialize;
use std::path::Path;

/// Workload for the `tryst` driver: how many speakers and listeners share one
/// communicator and how many words each speaker hands over.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TrystConfig {
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    #[serde(default = "defaults::speakers")]
    pub speakers: u32,
    #[serde(default = "defaults::listeners")]
    pub listeners: u32,
    #[serde(default = "defaults::words_per_speaker")]
    pub words_per_speaker: u32,
    #[serde(default = "defaults::report_interval_ms")]
    pub report_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

mod defaults {
    pub fn log_level() -> String {
        "info".into()
    }

    pub fn speakers() -> u32 {
        4
    }

    pub fn listeners() -> u32 {
        4
    }

    pub fn words_per_speaker() -> u32 {
        10_000
    }

    pub fn report_interval_ms() -> u64 {
        1_000
    }
}

impl Default for TrystConfig {
    fn default() -> Self {
        Self {
            log_level: defaults::log_level(),
            speakers: defaults::speakers(),
            listeners: defaults::listeners(),
            words_per_speaker: defaults::words_per_speaker(),
            report_interval_ms: defaults::report_interval_ms(),
        }
    }
}

impl TrystConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let toml_to_str = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&toml_to_str)
    }

    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: TrystConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Total number of words spoken (and heard) by one run.
    pub fn total_words(&self) -> u64 {
        self.speakers as u64 * self.words_per_speaker as u64
    }

    /// Words each listener takes. Only meaningful after [`validate`](Self::validate).
    pub fn words_per_listener(&self) -> u64 {
        self.total_words() / self.listeners as u64
    }

    /// Rejects workloads that would leave a speaker or listener blocked forever.
    ///
    /// Every word must be heard, so the spoken total has to split evenly
    /// across listeners. Words are numbered from zero as `u32`, so the total
    /// must stay within `u32::MAX`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.speakers == 0 || self.listeners == 0 {
            return Err(ConfigError::Invalid(
                "speakers and listeners must both be non-zero".into(),
            ));
        }
        if self.total_words() > u32::MAX as u64 {
            return Err(ConfigError::Invalid(format!(
                "{} words do not fit in the 32-bit word space",
                self.total_words()
            )));
        }
        if self.total_words() % self.listeners as u64 != 0 {
            return Err(ConfigError::Invalid(format!(
                "{} words cannot be split evenly across {} listeners",
                self.total_words(),
                self.listeners
            )));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "report_interval_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
