use crate::error::Result;
use crate::manifest::{Manifest, UpdateDescriptor};
use crate::platform::Platform;
use crate::transport::Transport;
use std::sync::Arc;
use tracing::debug;

/// Retrieves and decodes the remote update manifest.
pub struct ManifestFetcher<T> {
    transport: Arc<T>,
}

impl<T> ManifestFetcher<T>
where
    T: Transport,
{
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Issue a single GET to `endpoint` and decode the JSON body.
    ///
    /// Every failure (network, status, body) is reported as
    /// [`UpdaterError::ManifestUnavailable`](crate::UpdaterError::ManifestUnavailable).
    pub async fn fetch(&self, endpoint: &str) -> Result<Manifest> {
        debug!(%endpoint, "fetching update manifest");
        let body = self
            .transport
            .get_bytes(endpoint)
            .await
            .map_err(|err| err.into_unavailable())?;
        let manifest = Manifest::from_slice(&body).map_err(|err| err.into_unavailable())?;
        debug!(platforms = ?manifest.platforms().collect::<Vec<_>>(), "manifest decoded");
        Ok(manifest)
    }

    /// Pick the entry for `platform`.
    pub fn select_descriptor(
        manifest: &Manifest,
        platform: &Platform,
    ) -> Result<UpdateDescriptor> {
        manifest.select(platform)
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::UpdaterError;

    const ENDPOINT: &str = "https://updates.test/update.json";

    #[tokio::test]
    async fn fetch_decodes_manifest() {
        let transport = MockTransport::new();
        transport.insert(
            ENDPOINT,
            br#"{"linux": {"version": "1.0.1", "updateUrl": "u", "checksum": "c", "signature": "s"}}"#
                .to_vec(),
        );
        let fetcher = ManifestFetcher::new(Arc::new(transport));

        let manifest = fetcher.fetch(ENDPOINT).await.unwrap();
        let descriptor =
            ManifestFetcher::<MockTransport>::select_descriptor(&manifest, &Platform::new("linux"))
                .unwrap();
        assert_eq!(descriptor.version, "1.0.1");
        assert!(ManifestFetcher::<MockTransport>::select_descriptor(
            &manifest,
            &Platform::new("darwin")
        )
        .is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let fetcher = ManifestFetcher::new(Arc::new(MockTransport::new()));
        let err = fetcher.fetch(ENDPOINT).await.unwrap_err();
        assert!(matches!(err, UpdaterError::ManifestUnavailable(_)));
    }

    #[tokio::test]
    async fn non_json_body_is_unavailable() {
        let transport = MockTransport::new();
        transport.insert(ENDPOINT, b"502 bad gateway".to_vec());
        let fetcher = ManifestFetcher::new(Arc::new(transport));
        let err = fetcher.fetch(ENDPOINT).await.unwrap_err();
        assert!(matches!(err, UpdaterError::ManifestUnavailable(_)));
    }
}
