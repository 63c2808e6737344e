//! Bridge tunables, loadable from a TOML file.
//!
//! Every field has a default, so a missing or partial file is fine. CLI
//! flags override whatever the file says.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bridge::EngineSettings;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Serial baud rate.
    pub baud: u32,
    /// Streaming tick in milliseconds (~100 reports per second).
    pub tick_interval_ms: u64,
    /// Focus poll while paused.
    pub pause_poll_ms: u64,
    /// Input poll while recovering.
    pub recover_poll_ms: u64,
    /// Wall-clock budget for the sync handshake.
    pub handshake_budget_ms: u64,
    /// Per-byte read timeout.
    pub read_timeout_ms: u64,
    /// Mouse counts per full right-stick deflection (keyboard+mouse mode).
    pub mouse_divisor: f32,
    /// Device filter for the HID pad input variant.
    pub hidpad_vendor_id: u16,
    pub hidpad_product_id: u16,
    /// Device filter for the HID transport (microcontroller side).
    pub mcu_vendor_id: u16,
    pub mcu_product_id: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            baud: 1_000_000,
            tick_interval_ms: 10,
            pause_poll_ms: 100,
            recover_poll_ms: 500,
            handshake_budget_ms: 1000,
            read_timeout_ms: 50,
            mouse_divisor: crate::input::keymouse::MOUSE_DIVISOR,
            hidpad_vendor_id: crate::input::hidpad::DEFAULT_VENDOR_ID,
            hidpad_product_id: crate::input::hidpad::DEFAULT_PRODUCT_ID,
            // Pro-Controller-compatible ids, what the reference firmware
            // enumerates as.
            mcu_vendor_id: 0x0F0D,
            mcu_product_id: 0x0092,
        }
    }
}

impl BridgeConfig {
    /// `<config dir>/padbridge/config.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("padbridge").join("config.toml"))
    }

    /// Load from `explicit` when given (missing file is an error), else from
    /// the default path (missing file falls back to defaults).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    debug!("No config file, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let text = fs::read_to_string(&path)?;
        let config = toml::from_str(&text)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            pause_poll: Duration::from_millis(self.pause_poll_ms),
            recover_poll: Duration::from_millis(self.recover_poll_ms),
            handshake_budget: Duration::from_millis(self.handshake_budget_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }
}
