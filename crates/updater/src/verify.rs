//! Integrity and authenticity checks for downloaded artifacts.
//!
//! An artifact is accepted only when both hold:
//! - the SHA-1 digest of its bytes equals the published checksum, and
//! - the published DSA signature verifies over that same digest with the
//!   configured public key.
//!
//! The file is read once; a single running SHA-1 state serves both checks.

use crate::error::{Result, UpdaterError};
use crate::manifest::UpdateDescriptor;
use dsa::signature::DigestVerifier;
use dsa::VerifyingKey;
use pkcs8::DecodePublicKey;
use sha1::{Digest, Sha1};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Read buffer size (64 KiB).
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Which of the two checks failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationFailure {
    HashMismatch,
    SignatureMismatch,
    Both,
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            VerificationFailure::HashMismatch => "Invalid hash: artifact checksum does not match",
            VerificationFailure::SignatureMismatch => {
                "Invalid signature: artifact signature could not be verified"
            }
            VerificationFailure::Both => "Invalid hash and signature",
        };
        f.write_str(msg)
    }
}

/// Outcome of verifying one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Lowercase hex SHA-1 of the file contents.
    pub digest_hex: String,
    pub checksum_matches: bool,
    pub signature_valid: bool,
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        self.checksum_matches && self.signature_valid
    }

    pub fn failure(&self) -> Option<VerificationFailure> {
        match (self.checksum_matches, self.signature_valid) {
            (true, true) => None,
            (false, true) => Some(VerificationFailure::HashMismatch),
            (true, false) => Some(VerificationFailure::SignatureMismatch),
            (false, false) => Some(VerificationFailure::Both),
        }
    }
}

/// Verifies artifacts against a fixed DSA public key.
#[derive(Clone, Debug)]
pub struct ArtifactVerifier {
    key: VerifyingKey,
}

impl ArtifactVerifier {
    /// Parse an SPKI PEM public key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = VerifyingKey::from_public_key_pem(pem)
            .map_err(|err| UpdaterError::InvalidPublicKey(err.to_string()))?;
        Ok(Self { key })
    }

    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Hash the file at `path` and check it against `descriptor`.
    ///
    /// Mismatches are reported in the returned [`Verification`]; only I/O
    /// failures are errors.
    pub async fn verify(&self, path: &Path, descriptor: &UpdateDescriptor) -> Result<Verification> {
        let mut file = File::open(path).await?;
        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; READ_CHUNK_SIZE];
        let mut total: u64 = 0;

        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
            total += read as u64;
        }

        let digest_hex = hex::encode(hasher.clone().finalize());
        let checksum_matches = digest_hex == descriptor.normalized_checksum();
        let signature_valid = match descriptor.parsed_signature() {
            Ok(signature) => self.key.verify_digest(hasher, &signature).is_ok(),
            Err(err) => {
                warn!(error = %err, "update signature could not be decoded");
                false
            }
        };

        let verification = Verification {
            digest_hex,
            checksum_matches,
            signature_valid,
        };

        match verification.failure() {
            None => debug!(bytes = total, digest = %verification.digest_hex, "artifact verified"),
            Some(failure) => warn!(
                bytes = total,
                digest = %verification.digest_hex,
                expected = %descriptor.normalized_checksum(),
                %failure,
                "artifact rejected"
            ),
        }

        Ok(verification)
    }
}
