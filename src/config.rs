//! # Device and REPL Configuration
//!
//! Settings for the serial device and for the REPL dialogue, loaded from a
//! single TOML file. Every field has a default, so an empty file is valid.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [device]
//! port = "/dev/ttyACM0"
//! baud = 115200
//!
//! [repl]
//! prompt = ">>> "
//! response_timeout_ms = 2000
//! write_chunk_size = 256
//! ```
//!
//! - `device` is only read by the command-line front end, which opens the port.
//! - `repl` is handed to `ReplSession::connect` together with an open transport.

// src/config.rs - Single configuration file
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid REPL setting: {0}")]
    Invalid(String),
}

/// Main configuration struct for the serial device and the REPL session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub repl: ReplConfig,
}

/// Serial device configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub port: String,
    #[serde(default = "default_baud")]
    pub baud: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: "".to_string(),
            baud: default_baud(),
        }
    }
}

/// REPL dialogue settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplConfig {
    /// Marker printed by the interpreter when it is ready for input.
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_line_ending")]
    pub line_ending: String,
    /// Upper bound on the wait for the prompt after each statement.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Pause after `machine.bootloader()`, which produces no prompt.
    #[serde(default = "default_bootloader_delay_ms")]
    pub bootloader_delay_ms: u64,
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Maximum characters of file contents per `f.write(...)` statement.
    #[serde(default = "default_write_chunk_size")]
    pub write_chunk_size: usize,
    /// Send Ctrl-C before identifying the device, to stop a running program.
    #[serde(default = "default_interrupt_on_connect")]
    pub interrupt_on_connect: bool,
    /// Pending output is discarded until the line is quiet this long.
    #[serde(default = "default_drain_quiet_ms")]
    pub drain_quiet_ms: u64,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            line_ending: default_line_ending(),
            response_timeout_ms: default_response_timeout_ms(),
            bootloader_delay_ms: default_bootloader_delay_ms(),
            read_chunk_size: default_read_chunk_size(),
            max_response_bytes: default_max_response_bytes(),
            write_chunk_size: default_write_chunk_size(),
            interrupt_on_connect: default_interrupt_on_connect(),
            drain_quiet_ms: default_drain_quiet_ms(),
        }
    }
}

impl ReplConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn bootloader_delay(&self) -> Duration {
        Duration::from_millis(self.bootloader_delay_ms)
    }

    pub fn drain_quiet(&self) -> Duration {
        Duration::from_millis(self.drain_quiet_ms)
    }

    /// Validate REPL settings (prompt, chunk sizes, buffer bound)
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prompt.is_empty() {
            return Err(ConfigError::Invalid("prompt must not be empty".to_string()));
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::Invalid("read_chunk_size must be > 0".to_string()));
        }
        if self.write_chunk_size == 0 {
            return Err(ConfigError::Invalid("write_chunk_size must be > 0".to_string()));
        }
        if self.max_response_bytes < self.read_chunk_size {
            return Err(ConfigError::Invalid(format!(
                "max_response_bytes ({}) must be at least read_chunk_size ({})",
                self.max_response_bytes, self.read_chunk_size
            )));
        }
        Ok(())
    }
}

// Default value functions
fn default_baud() -> u32 { 115200 }
fn default_prompt() -> String { ">>> ".to_string() }
fn default_line_ending() -> String { "\r\n".to_string() }
fn default_response_timeout_ms() -> u64 { 2000 }
fn default_bootloader_delay_ms() -> u64 { 50 }
fn default_read_chunk_size() -> usize { 256 }
fn default_max_response_bytes() -> usize { 64 * 1024 }
fn default_write_chunk_size() -> usize { 256 }
fn default_interrupt_on_connect() -> bool { true }
fn default_drain_quiet_ms() -> u64 { 50 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let config: Config = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    config.repl.validate()?;
    Ok(config)
}
