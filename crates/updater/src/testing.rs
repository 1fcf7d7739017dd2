//! Shared helpers for unit tests.

use crate::error::{Result, UpdaterError};
use crate::manifest::UpdateDescriptor;
use crate::transport::{ByteStream, Transport};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use dsa::signature::{DigestSigner, SignatureEncoding};
use futures::stream::{self, StreamExt};
use pkcs8::DecodePrivateKey;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SIGNING_KEY_PEM: &str = include_str!("../tests/fixtures/signing_key.pem");
pub const VERIFYING_KEY_PEM: &str = include_str!("../tests/fixtures/verifying_key.pem");

const CHUNK: usize = 4096;

/// In-memory transport keyed by URL.
#[derive(Default)]
pub struct MockTransport {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    truncated: Mutex<HashMap<String, Vec<u8>>>,
    requests: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, data: Vec<u8>) {
        self.entries.lock().unwrap().insert(url.to_string(), data);
    }

    /// Serve `data` and then fail the stream.
    pub fn insert_truncated(&self, url: &str, data: Vec<u8>) {
        self.truncated.lock().unwrap().insert(url.to_string(), data);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| UpdaterError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get_bytes(&self, url: &str) -> Result<Bytes> {
        self.lookup(url).map(Bytes::from)
    }

    async fn get_stream(&self, url: &str) -> Result<ByteStream> {
        let truncated = self.truncated.lock().unwrap().get(url).cloned();
        if let Some(data) = truncated {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let chunks: Vec<Result<Bytes>> = data
                .chunks(CHUNK)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .chain(std::iter::once(Err(UpdaterError::validation(
                    "connection reset",
                ))))
                .collect();
            return Ok(stream::iter(chunks).boxed());
        }

        let data = self.lookup(url)?;
        let chunks: Vec<Result<Bytes>> = data
            .chunks(CHUNK)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Base64 DER signature over the SHA-1 digest of `data`, made with the fixture key.
pub fn sign(data: &[u8]) -> String {
    let key = dsa::SigningKey::from_pkcs8_pem(SIGNING_KEY_PEM).expect("fixture signing key");
    let signature: dsa::Signature = key.sign_digest(Sha1::new_with_prefix(data));
    general_purpose::STANDARD.encode(signature.to_vec())
}

/// Descriptor whose checksum and signature match `data`.
pub fn descriptor_for(version: &str, url: &str, data: &[u8]) -> UpdateDescriptor {
    UpdateDescriptor {
        version: version.to_string(),
        update_url: url.to_string(),
        checksum: sha1_hex(data),
        signature: sign(data),
    }
}
