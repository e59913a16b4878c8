use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::io;

/// Opens and enumerates serial ports.
///
/// The REPL session itself only needs an open byte channel; this seam is
/// where the front end decides how that channel is obtained.
#[async_trait]
pub trait SerialInterface: Send + Sync {
    async fn open(&self, port: &str, baud: u32) -> io::Result<SerialPort>;
    fn available_ports(&self) -> Vec<String>;
}

/// Native implementation of SerialInterface using serial2-tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSerial;

#[async_trait]
impl SerialInterface for NativeSerial {
    async fn open(&self, port: &str, baud: u32) -> io::Result<SerialPort> {
        tracing::info!("Opening {} at {} baud", port, baud);
        let serial = SerialPort::open(port, baud)?;
        Ok(serial)
    }

    fn available_ports(&self) -> Vec<String> {
        match SerialPort::available_ports() {
            Ok(paths) => paths.iter().map(|p| p.display().to_string()).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate serial ports: {}", e);
                vec![]
            }
        }
    }
}
