use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::config::SessionConfig;
use crate::data::catalog::FrameCatalog;
use crate::data::exposure::{ExposureMap, StepExposureMap};
use crate::data::loader::{load_frames, load_trap_registry};
use crate::data::model::{FrameFile, FrameStacks, TrapRegistry};
use crate::data::naming::{FilenameScheme, RoleClassifier, SubstringClassifier, UnderscoreScheme};
use crate::error::{Error, Result};
use crate::mask::{TrapMask, TrapMaskBuilder};
use crate::masked::MaskedStacks;
use crate::progress::{LoadProgress, ProgressCallback};

// ---------------------------------------------------------------------------
// SessionBuilder – construction parameters and pluggable strategies
// ---------------------------------------------------------------------------

/// Configures how a [`TrapSession`] is built.
pub struct SessionBuilder {
    config: SessionConfig,
    exposure: Arc<dyn ExposureMap>,
    scheme: Arc<dyn FilenameScheme>,
    classifier: Arc<dyn RoleClassifier>,
    progress: ProgressCallback,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionBuilder {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            exposure: Arc::new(StepExposureMap),
            scheme: Arc::new(UnderscoreScheme),
            classifier: Arc::new(SubstringClassifier),
            progress: None,
        }
    }

    /// Replace the index → exposure-time mapping.
    pub fn with_exposure_map(mut self, exposure: impl ExposureMap + 'static) -> Self {
        self.exposure = Arc::new(exposure);
        self
    }

    /// Replace the filename convention used to read index and sequence key.
    pub fn with_filename_scheme(mut self, scheme: impl FilenameScheme + 'static) -> Self {
        self.scheme = Arc::new(scheme);
        self
    }

    /// Replace the triplet role classifier.
    pub fn with_role_classifier(mut self, classifier: impl RoleClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_progress(mut self, callback: impl Fn(LoadProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// List the frames a directory load would use, without decoding them.
    pub fn catalog(&self, directory: &Path) -> Result<Vec<FrameFile>> {
        self.config.validate()?;
        FrameCatalog::new(
            self.exposure.as_ref(),
            self.scheme.as_ref(),
            self.classifier.as_ref(),
        )
        .list_frames(
            directory,
            &self.config.pattern,
            self.config.exposure_time_ms,
            self.config.tolerance_ms,
        )
    }

    /// Build a session from the image files and trap file in `directory`.
    pub fn load(self, directory: impl AsRef<Path>) -> Result<TrapSession> {
        let directory = directory.as_ref();
        log_start(directory);

        let traps = load_trap_registry(&directory.join(&self.config.trap_file_name))?;
        let frames = self.catalog(directory)?;
        if frames.is_empty() {
            return Err(Error::EmptyListing {
                path: directory.to_path_buf(),
                pattern: self.config.pattern.clone(),
                exposure_ms: self.config.exposure_time_ms,
            });
        }
        let stacks = load_frames(&frames, &self.config, &self.progress)?;

        Ok(TrapSession::new(
            Some(directory.to_path_buf()),
            self.config,
            frames,
            stacks,
            traps,
        ))
    }

    /// Build a session from frames already in memory; traps still come from `directory`.
    pub fn from_stacks(self, directory: impl AsRef<Path>, stacks: FrameStacks) -> Result<TrapSession> {
        let directory = directory.as_ref();
        log_start(directory);
        self.config.validate()?;

        let traps = load_trap_registry(&directory.join(&self.config.trap_file_name))?;
        Ok(TrapSession::new(
            Some(directory.to_path_buf()),
            self.config,
            Vec::new(),
            stacks,
            traps,
        ))
    }

    /// Build a session from in-memory frames and trap positions.
    pub fn from_parts(self, stacks: FrameStacks, traps: TrapRegistry) -> Result<TrapSession> {
        self.config.validate()?;
        Ok(TrapSession::new(None, self.config, Vec::new(), stacks, traps))
    }
}

fn log_start(directory: &Path) {
    let resolved = std::fs::canonicalize(directory).unwrap_or_else(|_| directory.to_path_buf());
    info!("Initializing session in path: {}", resolved.display());
}

// ---------------------------------------------------------------------------
// TrapSession – loaded frames plus trap positions
// ---------------------------------------------------------------------------

/// Loaded frame stacks and trap positions of one acquisition.
///
/// Immutable once built; every mask request returns a fresh [`MaskedStacks`]
/// borrowing the session's frames, so the same data can be viewed through many
/// trap selections without reloading.
#[derive(Debug, Clone)]
pub struct TrapSession {
    directory: Option<PathBuf>,
    config: SessionConfig,
    frames: Vec<FrameFile>,
    stacks: FrameStacks,
    traps: TrapRegistry,
}

impl TrapSession {
    fn new(
        directory: Option<PathBuf>,
        config: SessionConfig,
        frames: Vec<FrameFile>,
        stacks: FrameStacks,
        traps: TrapRegistry,
    ) -> Self {
        if !traps.contains(config.default_trap_id) {
            warn!(
                "Default trap {} is not in the trap registry; mask requests must name traps",
                config.default_trap_id
            );
        }
        Self {
            directory,
            config,
            frames,
            stacks,
            traps,
        }
    }

    /// Load a session from `directory` with default strategies.
    pub fn open(directory: impl AsRef<Path>, config: SessionConfig) -> Result<Self> {
        SessionBuilder::new(config).load(directory)
    }

    /// Source directory; `None` for sessions built from in-memory parts.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cataloged files in load order; empty for in-memory sessions.
    pub fn frames(&self) -> &[FrameFile] {
        &self.frames
    }

    pub fn stacks(&self) -> &FrameStacks {
        &self.stacks
    }

    pub fn traps(&self) -> &TrapRegistry {
        &self.traps
    }

    pub fn frame_shape(&self) -> (usize, usize) {
        self.stacks.frame_shape()
    }

    pub fn mask_builder(&self) -> TrapMaskBuilder<'_> {
        TrapMaskBuilder::new(&self.traps, self.config.default_trap_id)
    }

    /// Mask for `trap_ids` (default trap when empty) at `radius` (configured radius when `None`).
    pub fn trap_mask(&self, trap_ids: &[i64], radius: Option<f64>) -> Result<TrapMask> {
        let radius = radius.unwrap_or(self.config.trap_radius);
        self.mask_builder().build(self.frame_shape(), trap_ids, radius)
    }

    /// Mask all four stacks with the windows of `trap_ids`.
    pub fn rebuild_mask(&self, trap_ids: &[i64], radius: Option<f64>) -> Result<MaskedStacks<'_>> {
        let radius = radius.unwrap_or(self.config.trap_radius);
        let builder = self.mask_builder();
        let mask = builder.build(self.frame_shape(), trap_ids, radius)?;
        MaskedStacks::new(&self.stacks, mask, builder.resolve_ids(trap_ids), radius)
    }

    /// Mask all four stacks with the windows of every registered trap.
    pub fn mask_all_traps(&self, radius: Option<f64>) -> Result<MaskedStacks<'_>> {
        let radius = radius.unwrap_or(self.config.trap_radius);
        let mask = self.mask_builder().build_all(self.frame_shape(), radius)?;
        MaskedStacks::new(&self.stacks, mask, self.traps.ids(), radius)
    }
}
