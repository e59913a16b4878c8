// src/repl/mod.rs - MicroPython REPL dialogue
pub mod device_info;
pub mod literal;
pub mod session;

pub use session::ReplSession;

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("Device is not a valid MicroPython device")]
    InvalidDevice { response: String },
    #[error("Timed out after {0:?} waiting for the REPL prompt")]
    Timeout(Duration),
    #[error("Response exceeded {limit} bytes without a REPL prompt")]
    ResponseTooLarge { limit: usize },
    #[error("Device raised an exception: {0}")]
    Remote(String),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
