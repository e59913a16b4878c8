// src/file_manager.rs - Host-side files sent to the device
use std::path::Path;
use tokio::fs;

#[derive(Debug, Clone, Default)]
pub struct FileManager;

impl FileManager {
    pub fn new() -> Self {
        Self
    }

    /// Read a local text file to be saved on the device.
    pub async fn read_upload(&self, path: &str) -> Result<String, std::io::Error> {
        tracing::info!("Reading upload file: {}", path);
        let content = fs::read_to_string(path).await?;
        Ok(content)
    }

    /// Remote name for an upload: `remote` when given, otherwise the local
    /// file name without its directories.
    pub fn remote_name(&self, local: &str, remote: Option<&str>) -> String {
        if let Some(remote) = remote {
            return remote.to_string();
        }
        Path::new(local)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(local)
            .to_string()
    }
}
