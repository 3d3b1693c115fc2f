use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "kegboard-bridge";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name the device's messages are tagged with.
    pub device_name: String,
    pub serial: SerialSettings,
    pub kegnet: KegnetSettings,
    /// Duplicate readings are suppressed for this long; 0 disables suppression.
    pub suppression_window_seconds: u64,
    /// Upper bound on how long the manager waits before re-checking for shutdown.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: String,
    pub parity: String,
    pub stop_bits: String,
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KegnetSettings {
    pub addr: String,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: "kegboard".into(),
            serial: SerialSettings::default(),
            kegnet: KegnetSettings::default(),
            suppression_window_seconds: 60,
            poll_interval_ms: 1000,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            data_bits: "8".into(),
            parity: "none".into(),
            stop_bits: "1".into(),
            read_timeout_ms: 100,
        }
    }
}

impl Default for KegnetSettings {
    fn default() -> Self {
        Self {
            addr: "localhost:9805".into(),
            connect_timeout_ms: 2000,
            send_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Relays kegboard sensor readings to a kegnet server")]
pub struct Cli {
    /// TOML config file; defaults to the per-user config location
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serial device path
    #[arg(long = "kegboard-device")]
    pub device: Option<String>,

    /// Serial baud rate
    #[arg(long = "kegboard-speed")]
    pub speed: Option<u32>,

    /// host:port of the kegnet server
    #[arg(long)]
    pub kegnet_addr: Option<String>,

    /// Suppress duplicate readings for this many seconds (0 disables)
    #[arg(long)]
    pub cache_seconds: Option<u64>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(text).context("invalid config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let display = path.display();
        let text = fs::read_to_string(path).with_context(|| format!("reading {display}"))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing {display}"))
    }

    /// Loads the config file named on the command line, or the per-user one,
    /// then applies command line overrides.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => confy::load(APP_NAME, None).context("loading user config")?,
        };
        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Rejects timeouts of zero: they either spin a worker or make every
    /// socket call fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        let kegnet = &self.kegnet;
        ensure_nonzero("poll_interval_ms", self.poll_interval_ms)?;
        ensure_nonzero("serial.read_timeout_ms", self.serial.read_timeout_ms)?;
        ensure_nonzero("kegnet.connect_timeout_ms", kegnet.connect_timeout_ms)?;
        ensure_nonzero("kegnet.send_timeout_ms", kegnet.send_timeout_ms)?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(device) = &cli.device {
            self.serial.path = device.clone();
        }
        if let Some(speed) = cli.speed {
            self.serial.baud_rate = speed;
        }
        if let Some(addr) = &cli.kegnet_addr {
            self.kegnet.addr = addr.clone();
        }
        if let Some(seconds) = cli.cache_seconds {
            self.suppression_window_seconds = seconds;
        }
    }

    pub fn suppression_window(&self) -> Duration {
        Duration::from_secs(self.suppression_window_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn ensure_nonzero(name: &str, value: u64) -> anyhow::Result<()> {
    ensure!(value > 0, "invalid config: {} must be greater than zero", name);
    Ok(())
}

impl KegnetSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
