// src/communication/mod.rs - Serial transport for the command-line front end
pub mod serial;

pub use serial::{NativeSerial, SerialInterface};
