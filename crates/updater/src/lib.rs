//! Manifest-driven self-update client with checksum and signature verification.
//!
//! The updater fetches a JSON manifest keyed by platform, compares the
//! advertised version against the running one, streams the release artifact
//! to the application data directory and accepts it only when both its SHA-1
//! checksum and its DSA signature match the manifest entry. Progress is
//! published as [`UpdateEvent`]s to any number of subscribers.
//!
//! ```ignore
//! use updater::{UpdateEvent, Updater, UpdaterConfig};
//!
//! # async fn demo() -> updater::Result<()> {
//! let config = UpdaterConfig::new(env!("CARGO_PKG_VERSION"));
//! let updater = Updater::with_http(config)?;
//! let mut events = updater.subscribe();
//!
//! if updater.update().await? {
//!     while let Ok(event) = events.try_recv() {
//!         if let UpdateEvent::UpdateReady { path } = event {
//!             println!("verified update staged at {}", path.display());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod download;
mod error;
mod events;
mod fetcher;
mod manifest;
mod platform;
mod transport;
mod updater;
mod verify;
pub mod version;

#[cfg(test)]
mod testing;

pub use config::{Environment, UpdaterConfig, DEFAULT_ENDPOINT, DEFAULT_PUBLIC_KEY, ENVIRONMENT_VAR};
pub use download::ArtifactDownloader;
pub use error::{Result, UpdaterError};
pub use events::{EventBus, UpdateEvent};
pub use fetcher::ManifestFetcher;
pub use manifest::{Manifest, UpdateDescriptor};
pub use platform::{AppPaths, FixedPaths, Platform, SystemPaths};
pub use transport::{ByteStream, HttpTransport, HttpTransportBuilder, Transport};
pub use updater::{Installer, UpdateState, Updater};
pub use verify::{ArtifactVerifier, Verification, VerificationFailure};
