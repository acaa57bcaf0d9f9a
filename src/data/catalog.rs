use std::path::Path;

use glob::Pattern;
use log::{debug, info, warn};

use super::exposure::ExposureMap;
use super::model::FrameFile;
use super::naming::{FilenameScheme, RoleClassifier};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// FrameCatalog: directory → ordered, exposure-filtered frame files
// ---------------------------------------------------------------------------

/// Selects the files of one acquisition from a directory.
///
/// A file is kept when its name matches the glob pattern and the exposure time
/// derived from its acquisition index is within the tolerance of the target.
/// Kept files are ordered by sequence key, then by name, so the result does not
/// depend on directory listing order.
pub struct FrameCatalog<'a> {
    pub exposure: &'a dyn ExposureMap,
    pub scheme: &'a dyn FilenameScheme,
    pub classifier: &'a dyn RoleClassifier,
}

impl<'a> FrameCatalog<'a> {
    pub fn new(
        exposure: &'a dyn ExposureMap,
        scheme: &'a dyn FilenameScheme,
        classifier: &'a dyn RoleClassifier,
    ) -> Self {
        Self {
            exposure,
            scheme,
            classifier,
        }
    }

    /// List the frames of `directory` at `target_exposure_ms`.
    ///
    /// Files whose names cannot be parsed are skipped with a warning. An index outside
    /// the exposure map fails the whole listing.
    pub fn list_frames(
        &self,
        directory: &Path,
        pattern: &str,
        target_exposure_ms: f64,
        tolerance_ms: f64,
    ) -> Result<Vec<FrameFile>> {
        let pattern_matcher = Pattern::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let read_dir_err = |source| Error::ReadDirectory {
            path: directory.to_path_buf(),
            source,
        };

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(directory).map_err(read_dir_err)? {
            let entry = entry.map_err(read_dir_err)?;
            if entry.file_type().map_err(read_dir_err)?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
                continue;
            };
            if !pattern_matcher.matches(&name) {
                continue;
            }

            let keys = self
                .scheme
                .acquisition_index(&name)
                .and_then(|index| Ok((index, self.scheme.sequence_key(&name)?)));
            let (index, sequence) = match keys {
                Ok(keys) => keys,
                Err(e) => {
                    warn!("Skipping {name}: {e}");
                    continue;
                }
            };

            let exposure_ms = self.exposure.exposure_time_ms(index)?;
            // NaN never compares within tolerance, so it is never selected.
            if !((exposure_ms - target_exposure_ms).abs() <= tolerance_ms) {
                continue;
            }

            let role = self.classifier.classify(&name);
            debug!("Selected {name} (index {index}, {exposure_ms} ms, {role})");
            frames.push(FrameFile {
                path: entry.path(),
                name,
                index,
                sequence,
                exposure_ms,
                role,
            });
        }

        frames.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        info!(
            "Cataloged {} frames at {target_exposure_ms} ms in {}",
            frames.len(),
            directory.display()
        );
        Ok(frames)
    }
}
