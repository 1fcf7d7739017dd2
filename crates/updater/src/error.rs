/// Convenient result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Errors that can occur while checking for, fetching or staging an update.
#[derive(thiserror::Error, Debug)]
pub enum UpdaterError {
    /// Network request failed before a response was received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// The manifest body could not be decoded from JSON.
    #[error("manifest decoding failed: {0}")]
    ManifestDecode(#[from] serde_json::Error),
    /// The manifest could not be retrieved or understood.
    #[error("manifest unavailable: {0}")]
    ManifestUnavailable(String),
    /// The manifest carries no entry for the running platform.
    #[error("platform not supported by manifest: {0}")]
    PlatformNotSupported(String),
    /// A version string is not valid semver, even after normalization.
    #[error("invalid version {input:?}: {source}")]
    VersionParse {
        /// The offending version string, as normalized.
        input: String,
        /// Parser error.
        #[source]
        source: semver::Error,
    },
    /// The configured verification key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),
    /// `verify` or `install` was called without a prior successful `check`.
    #[error("no pending update; call check() first")]
    NoPendingUpdate,
    /// Another update cycle is already running on this instance.
    #[error("an update cycle is already in progress")]
    Busy,
    /// `install` was called but no installer is configured.
    #[error("no installer configured")]
    InstallerMissing,
    /// `install` was called before a verified artifact was staged.
    #[error("no verified artifact is staged for installation")]
    NotReady,
    /// Failed to perform an I/O operation.
    #[error("filesystem operation failed: {0}")]
    Io(#[from] std::io::Error),
    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl UpdaterError {
    /// Helper for wrapping validation failures.
    pub fn validation(msg: impl Into<String>) -> Self {
        UpdaterError::Other(msg.into())
    }

    /// Collapse a fetch or decode failure into the recoverable
    /// [`UpdaterError::ManifestUnavailable`] condition.
    pub(crate) fn into_unavailable(self) -> Self {
        match self {
            err @ UpdaterError::ManifestUnavailable(_) => err,
            other => UpdaterError::ManifestUnavailable(other.to_string()),
        }
    }
}
