//! Platform identification and the local staging location for artifacts.

use crate::error::{Result, UpdaterError};
use std::fmt;
use std::path::PathBuf;

/// Artifact file name on Windows-family platforms.
pub const WINDOWS_ARTIFACT: &str = "update.exe";
/// Artifact file name everywhere else.
pub const DEFAULT_ARTIFACT: &str = "update.pkg";

/// Platform identifier as used for the manifest keys (`darwin`, `win32`, `linux`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform(String);

impl Platform {
    /// Wrap an arbitrary manifest key.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The platform this process runs on.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a Rust OS name (`std::env::consts::OS`) to its manifest key.
    pub fn from_os(os: &str) -> Self {
        let id = match os {
            "macos" => "darwin",
            "windows" => "win32",
            other => other,
        };
        Self(id.to_string())
    }

    /// Manifest key for this platform.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is a Windows-family platform.
    pub fn is_windows_family(&self) -> bool {
        self.0 == "win32"
    }

    /// File name the downloaded artifact is staged under.
    pub fn artifact_file_name(&self) -> &'static str {
        if self.is_windows_family() {
            WINDOWS_ARTIFACT
        } else {
            DEFAULT_ARTIFACT
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Source of per-user application directories.
pub trait AppPaths: Send + Sync {
    /// Platform-conventional per-user application data directory.
    fn app_support_dir(&self) -> Result<PathBuf>;
}

/// Resolves directories from the operating system conventions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPaths;

impl AppPaths for SystemPaths {
    fn app_support_dir(&self) -> Result<PathBuf> {
        dirs::data_dir()
            .ok_or_else(|| UpdaterError::validation("failed to determine application data directory"))
    }
}

/// A fixed directory, for tests and hosts that manage their own layout.
#[derive(Debug, Clone)]
pub struct FixedPaths(PathBuf);

impl FixedPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self(dir.into())
    }
}

impl AppPaths for FixedPaths {
    fn app_support_dir(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

/// Local destination for the artifact: `<app-support-dir>/<file name>`.
pub fn artifact_path(paths: &dyn AppPaths, platform: &Platform) -> Result<PathBuf> {
    Ok(paths
        .app_support_dir()?
        .join(platform.artifact_file_name()))
}
