// mpy-repl: drive a MicroPython interpreter over a serial link

pub mod communication;
pub mod config;
pub mod file_manager;
pub mod repl;

pub use config::{Config, ConfigError, DeviceConfig, ReplConfig};
pub use repl::device_info::DeviceInfo;
pub use repl::{ReplError, ReplSession};
