//! Proxy configuration
//!
//! Loaded from a TOML file; every field has a default so a partial file (or
//! none at all) works. Command-line flags are applied on top in `main`.

use std::fs;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use blazebridge_control::ClientConfig;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::pixels::MAX_PIXELS_PER_UNIVERSE;

/// Highest sACN universe number
pub const MAX_UNIVERSE: u16 = 63999;

/// Shortest throughput reporting interval
pub const MIN_THROUGHPUT_INTERVAL_MS: u64 = 500;

const MAX_OUTPUT_FPS: f64 = 1000.0;

/// Top-level proxy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Interface used to join the sACN multicast groups
    pub bind_address: Ipv4Addr,
    /// IP address or host name of the Pixelblaze
    pub pixelblaze_address: String,
    /// First sACN universe to listen on
    pub first_universe: u16,
    /// Number of consecutive universes
    pub universe_count: u16,
    /// Pixels taken from each universe (1-170)
    pub pixels_per_universe: usize,
    /// Upper bound on frames pushed to the device per second
    pub max_output_fps: f64,
    /// How often the output frame rate is measured
    pub throughput_interval_ms: u64,
    /// Report the output frame rate at info level
    pub show_fps: bool,
    /// Exported pattern variable receiving the pixel array
    pub variable_name: String,
    pub device: DeviceSettings,
    pub logging: LogConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: Ipv4Addr::UNSPECIFIED,
            pixelblaze_address: String::new(),
            first_universe: 1,
            universe_count: 4,
            pixels_per_universe: MAX_PIXELS_PER_UNIVERSE,
            max_output_fps: 30.0,
            throughput_interval_ms: 3000,
            show_fps: false,
            variable_name: "pixels".to_string(),
            device: DeviceSettings::default(),
            logging: LogConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// `<config dir>/blazebridge/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("blazebridge");
            p.push("config.toml");
            p
        })
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    /// Load the explicit file if given, else the default file if it exists,
    /// else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Clamp values into their valid ranges and reject unusable settings
    pub fn normalize(&mut self) -> Result<()> {
        self.pixelblaze_address = self.pixelblaze_address.trim().to_string();
        if self.pixelblaze_address.is_empty() {
            bail!("No Pixelblaze address configured");
        }
        if self.variable_name.trim().is_empty() {
            bail!("Pattern variable name must not be empty");
        }
        if !(self.max_output_fps.is_finite() && self.max_output_fps > 0.0) {
            bail!("Invalid max output fps: {}", self.max_output_fps);
        }

        self.max_output_fps = self.max_output_fps.min(MAX_OUTPUT_FPS);
        self.pixels_per_universe = self.pixels_per_universe.clamp(1, MAX_PIXELS_PER_UNIVERSE);
        self.throughput_interval_ms = self.throughput_interval_ms.max(MIN_THROUGHPUT_INTERVAL_MS);
        self.first_universe = self.first_universe.clamp(1, MAX_UNIVERSE);
        self.universe_count = self
            .universe_count
            .clamp(1, MAX_UNIVERSE - self.first_universe + 1);
        Ok(())
    }

    /// Listened universes, kept inside 1..=MAX_UNIVERSE and never empty
    pub fn universes(&self) -> RangeInclusive<u16> {
        let first = self.first_universe.clamp(1, MAX_UNIVERSE);
        let last = first
            .saturating_add(self.universe_count.saturating_sub(1))
            .min(MAX_UNIVERSE);
        first..=last
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.max_output_fps)
    }

    pub fn throughput_interval(&self) -> Duration {
        Duration::from_millis(self.throughput_interval_ms)
    }

    pub fn client_config(&self) -> ClientConfig {
        self.device.client_config()
    }
}

/// Pixelblaze connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub drain_timeout_ms: u64,
    pub recv_timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            port: defaults.port,
            connect_timeout_ms: defaults.connect_timeout.as_millis() as u64,
            drain_timeout_ms: defaults.drain_timeout.as_millis() as u64,
            recv_timeout_ms: defaults.recv_timeout.as_millis() as u64,
        }
    }
}

impl DeviceSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            port: self.port,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default level filter; `RUST_LOG` takes precedence
    pub level: String,
    pub console_output: bool,
    pub file_output: bool,
    pub log_dir: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: dirs::data_local_dir()
                .map(|p| p.join("blazebridge").join("logs"))
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

impl LogConfig {
    /// Configured level, INFO if it does not parse
    pub fn parse_level(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }

    pub fn ensure_log_directory(&self) -> std::io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir.join("blazebridge.log")
    }
}
