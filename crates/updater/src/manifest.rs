use crate::error::{Result, UpdaterError};
use crate::platform::Platform;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One platform's release entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateDescriptor {
    /// Version string of the candidate release.
    pub version: String,
    /// Download location of the artefact.
    #[serde(rename = "updateUrl")]
    pub update_url: String,
    /// Expected SHA-1 digest of the artefact, hex encoded.
    pub checksum: String,
    /// Base64 encoded DER DSA signature over the artefact's SHA-1 digest.
    pub signature: String,
}

impl UpdateDescriptor {
    /// Decode the detached DSA signature.
    pub fn parsed_signature(&self) -> Result<dsa::Signature> {
        let raw = general_purpose::STANDARD
            .decode(self.signature.trim().as_bytes())
            .map_err(|err| {
                UpdaterError::validation(format!("malformed base64 signature: {err}"))
            })?;

        dsa::Signature::try_from(raw.as_slice())
            .map_err(|_| UpdaterError::validation("signature is not a DER encoded DSA signature"))
    }

    /// Published checksum, trimmed and lower-cased.
    pub fn normalized_checksum(&self) -> String {
        self.checksum.trim().to_ascii_lowercase()
    }
}

/// Remote manifest: platform key to release entry.
///
/// Entries stay undecoded until one is selected, so a malformed entry for
/// another platform never hides a valid one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Manifest {
    entries: HashMap<String, Value>,
}

impl Manifest {
    /// Decode a manifest from a JSON body. Only the top-level object shape is
    /// checked here.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decode the entry for `platform`.
    ///
    /// Fails with [`UpdaterError::PlatformNotSupported`] when the key is
    /// absent and [`UpdaterError::ManifestUnavailable`] when its entry does
    /// not decode.
    pub fn select(&self, platform: &Platform) -> Result<UpdateDescriptor> {
        let entry = self
            .entries
            .get(platform.as_str())
            .ok_or_else(|| UpdaterError::PlatformNotSupported(platform.to_string()))?;
        serde_json::from_value(entry.clone()).map_err(|err| {
            UpdaterError::ManifestUnavailable(format!("malformed entry for {platform}: {err}"))
        })
    }

    /// Platform keys listed in the manifest.
    pub fn platforms(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "darwin": {
            "version": "3.1.0-2",
            "updateUrl": "https://example.com/update.pkg",
            "checksum": "23C290670A465864CA75BB2E1F75C8EA3F21A5EA",
            "signature": "MCwCFG57UmSskrEWDElycrNi6qezG0JAAhRbhZJ/XMyEZtIj+J7dJWD3ya78hg=="
        },
        "win32": {
            "version": "3.1.0-2",
            "updateUrl": "https://example.com/update.exe",
            "checksum": "00",
            "signature": "AA=="
        }
    }"#;

    #[test]
    fn decodes_platform_map() {
        let manifest = Manifest::from_slice(BODY.as_bytes()).unwrap();
        let mut platforms: Vec<_> = manifest.platforms().collect();
        platforms.sort();
        assert_eq!(platforms, vec!["darwin", "win32"]);

        let darwin = manifest.select(&Platform::new("darwin")).unwrap();
        assert_eq!(darwin.version, "3.1.0-2");
        assert_eq!(darwin.update_url, "https://example.com/update.pkg");
        assert_eq!(
            darwin.normalized_checksum(),
            "23c290670a465864ca75bb2e1f75c8ea3f21a5ea"
        );
        assert!(darwin.parsed_signature().is_ok());
    }

    #[test]
    fn missing_platform_is_reported() {
        let manifest = Manifest::from_slice(BODY.as_bytes()).unwrap();
        let err = manifest.select(&Platform::new("linux")).unwrap_err();
        assert!(matches!(err, UpdaterError::PlatformNotSupported(ref p) if p == "linux"));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            Manifest::from_slice(b"<html>oops</html>").unwrap_err(),
            UpdaterError::ManifestDecode(_)
        ));
        assert!(Manifest::from_slice(b"[1, 2]").is_err());
    }

    #[test]
    fn malformed_selected_entry_is_unavailable() {
        let manifest =
            Manifest::from_slice(br#"{"darwin": {"version": "1.0.0"}, "linux": null}"#).unwrap();
        assert!(matches!(
            manifest.select(&Platform::new("darwin")).unwrap_err(),
            UpdaterError::ManifestUnavailable(_)
        ));
        assert!(matches!(
            manifest.select(&Platform::new("linux")).unwrap_err(),
            UpdaterError::ManifestUnavailable(_)
        ));
    }

    #[test]
    fn malformed_sibling_entry_does_not_hide_platform() {
        let body = BODY.replacen('{', r#"{"linux": null, "freebsd": {"version": 3},"#, 1);
        let manifest = Manifest::from_slice(body.as_bytes()).unwrap();

        let darwin = manifest.select(&Platform::new("darwin")).unwrap();
        assert_eq!(darwin.version, "3.1.0-2");
    }

    #[test]
    fn garbage_signatures_do_not_parse() {
        let manifest = Manifest::from_slice(BODY.as_bytes()).unwrap();
        let win = manifest.select(&Platform::new("win32")).unwrap();
        assert!(win.parsed_signature().is_err());

        let mut bad = win.clone();
        bad.signature = "not base64!".into();
        assert!(bad.parsed_signature().is_err());
    }
}
