use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub link: LinkConfig,
    pub polling: PollingConfig,
    /// Barometer on its own serial port; absent when not fitted.
    #[serde(default)]
    pub pressure: Option<PressureConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
pub struct LinkConfig {
    /// Serial device of the node receiver, e.g. `/dev/ttyACM0`
    pub port: String,
    pub baud_rate: u32,
    /// How long to wait for a response line
    pub timeout_ms: u64,
    /// Pause between the link resync and the request
    pub settle_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    /// Interval in seconds between station cycles
    pub interval_secs: u64,
    /// Pause in milliseconds between requests within a cycle
    pub pacing_ms: u64,
    /// Attempts per node before a poll is given up
    pub max_attempts: u32,
}

#[derive(Debug, Deserialize)]
pub struct PressureConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    pub settle_ms: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub filter: Option<String>,
}

impl LinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl PressureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link: LinkConfig {
                port: "/dev/ttyACM0".to_string(),
                baud_rate: 9600,
                timeout_ms: 2000,
                settle_ms: 100,
            },
            polling: PollingConfig {
                interval_secs: 60,
                pacing_ms: 100,
                max_attempts: 3,
            },
            pressure: None,
            logging: LoggingConfig::default(),
        }
    }
}
