//! Streaming artifact download.

use crate::error::Result;
use crate::transport::Transport;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Copies a remote body into a local file.
pub struct ArtifactDownloader<T> {
    transport: Arc<T>,
}

impl<T> ArtifactDownloader<T>
where
    T: Transport,
{
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Stream `source` into `destination`, creating or truncating the file.
    ///
    /// Parent directories are not created. A transport error mid-stream leaves
    /// a truncated file behind; only verification decides whether the file is
    /// usable.
    pub async fn download(&self, source: &str, destination: &Path) -> Result<PathBuf> {
        info!(%source, destination = %destination.display(), "downloading update");

        let mut stream = self.transport.get_stream(source).await?;
        let mut file = File::create(destination).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        debug!(bytes = written, "download complete");
        Ok(destination.to_path_buf())
    }
}
