use crate::{
    config::UpdaterConfig,
    download::ArtifactDownloader,
    error::{Result, UpdaterError},
    events::{EventBus, UpdateEvent},
    fetcher::ManifestFetcher,
    manifest::UpdateDescriptor,
    platform::{artifact_path, AppPaths, SystemPaths},
    transport::{HttpTransport, Transport},
    verify::ArtifactVerifier,
    version,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Installs a verified artifact. Implemented by the host application.
#[async_trait]
pub trait Installer: Send + Sync {
    async fn install(&self, artifact: &Path, descriptor: &UpdateDescriptor) -> Result<()>;
}

/// Where the current update cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Checking,
    NoUpdate,
    UpdateFound,
    Downloading,
    Verifying,
    Rejected,
    Ready,
    Installing,
    Installed,
}

struct Cycle {
    state: UpdateState,
    pending: Option<UpdateDescriptor>,
    staged: Option<PathBuf>,
}

/// Clears the busy flag when the operation holding it finishes.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| CycleGuard(flag))
            .map_err(|_| UpdaterError::Busy)
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Checks for, downloads and verifies updates described by a remote manifest.
///
/// One cycle runs at a time per instance; overlapping calls fail with
/// [`UpdaterError::Busy`].
pub struct Updater<T> {
    config: UpdaterConfig,
    fetcher: ManifestFetcher<T>,
    downloader: ArtifactDownloader<T>,
    verifier: ArtifactVerifier,
    paths: Arc<dyn AppPaths>,
    installer: Option<Arc<dyn Installer>>,
    events: EventBus,
    cycle: Mutex<Cycle>,
    busy: AtomicBool,
}

impl Updater<HttpTransport> {
    /// Create an updater that talks HTTP through reqwest.
    pub fn with_http(config: UpdaterConfig) -> Result<Self> {
        Self::new(config, HttpTransport::builder().build()?)
    }
}

impl<T> Updater<T>
where
    T: Transport,
{
    /// Create a new updater. Fails if the public key does not decode or the
    /// running version is not a valid version string.
    pub fn new(config: UpdaterConfig, transport: T) -> Result<Self> {
        version::parse(&config.current_version)?;
        let verifier = ArtifactVerifier::from_pem(&config.public_key_pem)?;
        let transport = Arc::new(transport);

        debug!(
            current_version = %config.current_version,
            platform = %config.platform,
            environment = ?config.environment,
            "updater initialized"
        );

        Ok(Self {
            fetcher: ManifestFetcher::new(transport.clone()),
            downloader: ArtifactDownloader::new(transport),
            verifier,
            paths: Arc::new(SystemPaths),
            installer: None,
            events: EventBus::default(),
            cycle: Mutex::new(Cycle {
                state: UpdateState::Idle,
                pending: None,
                staged: None,
            }),
            busy: AtomicBool::new(false),
            config,
        })
    }

    /// Resolve the application data directory through `paths`.
    pub fn with_paths(mut self, paths: impl AppPaths + 'static) -> Self {
        self.paths = Arc::new(paths);
        self
    }

    /// Install verified artifacts with `installer`.
    pub fn with_installer(mut self, installer: impl Installer + 'static) -> Self {
        self.installer = Some(Arc::new(installer));
        self
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Receive lifecycle notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> UpdateState {
        self.cycle().state
    }

    /// Descriptor selected by the last successful check.
    pub fn pending(&self) -> Option<UpdateDescriptor> {
        self.cycle().pending.clone()
    }

    /// Local path the artifact is downloaded to.
    pub fn output_path(&self) -> Result<PathBuf> {
        artifact_path(self.paths.as_ref(), &self.config.platform)
    }

    /// Look for a newer release.
    ///
    /// Resolves to `false` outside production, when the manifest cannot be
    /// fetched or lacks this platform, and when the release is not newer.
    ///
    /// A failed fetch or a malformed remote version leaves an earlier pending
    /// update in place, and the state stays [`UpdateState::UpdateFound`] so a
    /// following [`update`](Self::update) still acts on it. Only a manifest
    /// that reports no newer release clears it.
    pub async fn check(&self) -> Result<bool> {
        let _guard = CycleGuard::acquire(&self.busy)?;
        self.run_check().await
    }

    /// Stream `source` into `output`.
    pub async fn download(&self, source: &str, output: &Path) -> Result<PathBuf> {
        let _guard = CycleGuard::acquire(&self.busy)?;
        self.run_download(source, output).await
    }

    /// Verify the file at `source` against the pending descriptor.
    ///
    /// Fails with [`UpdaterError::NoPendingUpdate`] when no check has found
    /// an update yet.
    pub async fn verify(&self, source: &Path) -> Result<bool> {
        let _guard = CycleGuard::acquire(&self.busy)?;
        self.run_verify(source).await
    }

    /// Run the whole pipeline.
    ///
    /// With a pending descriptor: download, verify, then install when an
    /// installer is configured. Without one: check first, then download and
    /// verify, leaving installation to an explicit [`install`](Self::install).
    pub async fn update(&self) -> Result<bool> {
        let _guard = CycleGuard::acquire(&self.busy)?;

        if let Some(descriptor) = self.pending() {
            let output = self.output_path()?;
            self.run_download(&descriptor.update_url, &output).await?;
            if !self.run_verify(&output).await? {
                return Ok(false);
            }
            if let Some(installer) = self.installer.clone() {
                self.run_install(installer.as_ref(), &output, &descriptor)
                    .await?;
            }
            return Ok(true);
        }

        if !self.run_check().await? {
            return Ok(false);
        }
        let descriptor = self.pending().ok_or(UpdaterError::NoPendingUpdate)?;
        let output = self.output_path()?;
        self.run_download(&descriptor.update_url, &output).await?;
        self.run_verify(&output).await
    }

    /// Hand the staged artifact to the installer.
    pub async fn install(&self) -> Result<()> {
        let _guard = CycleGuard::acquire(&self.busy)?;
        let installer = self
            .installer
            .clone()
            .ok_or(UpdaterError::InstallerMissing)?;
        let (path, descriptor) = {
            let cycle = self.cycle();
            if cycle.state != UpdateState::Ready {
                return Err(UpdaterError::NotReady);
            }
            let descriptor = cycle.pending.clone().ok_or(UpdaterError::NoPendingUpdate)?;
            let path = cycle.staged.clone().ok_or(UpdaterError::NotReady)?;
            (path, descriptor)
        };
        self.run_install(installer.as_ref(), &path, &descriptor)
            .await
    }

    async fn run_check(&self) -> Result<bool> {
        if !self.config.environment.is_production() {
            debug!("not running in production; skipping update check");
            self.set_state(UpdateState::NoUpdate);
            return Ok(false);
        }

        self.set_state(UpdateState::Checking);
        let descriptor = match self.fetch_descriptor().await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(error = %err, "update check failed; treating as no update");
                self.settle_inconclusive_check();
                return Ok(false);
            }
        };

        let newer = match version::is_newer(&descriptor.version, &self.config.current_version) {
            Ok(newer) => newer,
            Err(err) => {
                warn!(error = %err, "manifest version is malformed; treating as no update");
                self.settle_inconclusive_check();
                return Ok(false);
            }
        };

        if !newer {
            info!(
                current = %self.config.current_version,
                available = %descriptor.version,
                "already up to date"
            );
            let mut cycle = self.cycle();
            cycle.state = UpdateState::NoUpdate;
            cycle.pending = None;
            return Ok(false);
        }

        info!(
            current = %self.config.current_version,
            available = %descriptor.version,
            "update available"
        );
        let announce = {
            let mut cycle = self.cycle();
            let changed = cycle
                .pending
                .as_ref()
                .map_or(true, |pending| pending.version != descriptor.version);
            cycle.state = UpdateState::UpdateFound;
            cycle.pending = Some(descriptor.clone());
            changed
        };
        if announce {
            self.events.emit(UpdateEvent::Download {
                version: descriptor.version,
            });
        }
        Ok(true)
    }

    /// A check that could not reach a verdict keeps any earlier finding.
    fn settle_inconclusive_check(&self) {
        let mut cycle = self.cycle();
        cycle.state = if cycle.pending.is_some() {
            UpdateState::UpdateFound
        } else {
            UpdateState::NoUpdate
        };
    }

    async fn fetch_descriptor(&self) -> Result<UpdateDescriptor> {
        let manifest = self.fetcher.fetch(&self.config.endpoint).await?;
        ManifestFetcher::<T>::select_descriptor(&manifest, &self.config.platform)
    }

    async fn run_download(&self, source: &str, output: &Path) -> Result<PathBuf> {
        self.set_state(UpdateState::Downloading);
        match self.downloader.download(source, output).await {
            Ok(path) => Ok(path),
            Err(err) => {
                let mut cycle = self.cycle();
                cycle.state = if cycle.pending.is_some() {
                    UpdateState::UpdateFound
                } else {
                    UpdateState::Idle
                };
                Err(err)
            }
        }
    }

    async fn run_verify(&self, source: &Path) -> Result<bool> {
        let descriptor = self.pending().ok_or(UpdaterError::NoPendingUpdate)?;
        self.set_state(UpdateState::Verifying);

        let verification = match self.verifier.verify(source, &descriptor).await {
            Ok(verification) => verification,
            Err(err) => {
                self.set_state(UpdateState::Rejected);
                return Err(err);
            }
        };

        if let Some(failure) = verification.failure() {
            {
                let mut cycle = self.cycle();
                cycle.state = UpdateState::Rejected;
                cycle.staged = None;
            }
            self.events.emit(UpdateEvent::Error {
                message: failure.to_string(),
            });
            return Ok(false);
        }

        {
            let mut cycle = self.cycle();
            cycle.state = UpdateState::Ready;
            cycle.staged = Some(source.to_path_buf());
        }
        info!(path = %source.display(), version = %descriptor.version, "update ready");
        self.events.emit(UpdateEvent::UpdateReady {
            path: source.to_path_buf(),
        });
        Ok(true)
    }

    async fn run_install(
        &self,
        installer: &dyn Installer,
        path: &Path,
        descriptor: &UpdateDescriptor,
    ) -> Result<()> {
        self.set_state(UpdateState::Installing);
        if let Err(err) = installer.install(path, descriptor).await {
            warn!(error = %err, "installer failed");
            self.set_state(UpdateState::Ready);
            return Err(err);
        }

        {
            let mut cycle = self.cycle();
            cycle.state = UpdateState::Installed;
            cycle.pending = None;
            cycle.staged = None;
        }
        info!(version = %descriptor.version, "update installed");
        self.events.emit(UpdateEvent::Installed {
            version: descriptor.version.clone(),
            path: path.to_path_buf(),
        });
        Ok(())
    }

    fn cycle(&self) -> MutexGuard<'_, Cycle> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: UpdateState) {
        self.cycle().state = state;
    }
}
