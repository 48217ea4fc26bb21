use std::path::{Path, PathBuf};

use sonorover_core::defined::MAX_FILE_SUFFIX;

use crate::error::OutputError;

/// Paths of the files written for one sequence.
///
/// All files share the stem of the raw waveform log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    raw: PathBuf,
}

impl OutputFiles {
    /// Selects a free raw log path.
    ///
    /// If `path` is taken, `stem_00.ext` to `stem_99.ext` are tried in order.
    #[tracing::instrument(level = "debug")]
    pub fn select(path: &Path) -> Result<Self, OutputError> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir.is_dir() {
            return Err(OutputError::NoDirectory(dir));
        }
        if !path.exists() {
            return Ok(Self::from_raw(path.to_path_buf()));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (0..=MAX_FILE_SUFFIX)
            .map(|i| dir.join(format!("{stem}_{i:02}{ext}")))
            .find(|candidate| {
                let free = !candidate.exists();
                tracing::debug!("try: {} : ok ?: {}", candidate.display(), free);
                free
            })
            .map(Self::from_raw)
            .ok_or_else(|| OutputError::NoFreeName(path.to_path_buf()))
    }

    /// Uses `raw` as is.
    #[must_use]
    pub const fn from_raw(raw: PathBuf) -> Self {
        Self { raw }
    }

    /// Raw waveform log.
    #[must_use]
    pub fn raw(&self) -> &Path {
        &self.raw
    }

    /// Field volume dump.
    #[must_use]
    pub fn volume(&self) -> PathBuf {
        self.raw.with_extension("acd")
    }

    /// Coordinate table of the visited points.
    #[must_use]
    pub fn coordinates(&self) -> PathBuf {
        self.raw.with_extension("csv")
    }

    /// Run parameters.
    #[must_use]
    pub fn parameters(&self) -> PathBuf {
        self.raw.with_extension("toml")
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let stem = self
            .raw
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.raw.with_file_name(format!("{stem}_{suffix}"))
    }

    /// Coordinate table sampling the fitted acoustic axis.
    #[must_use]
    pub fn axis_table(&self) -> PathBuf {
        self.sibling("axis.csv")
    }

    /// Diagnostic table of one alignment line scan.
    #[must_use]
    pub fn diagnostics(&self, plane: usize, iteration: usize, axis: char) -> PathBuf {
        self.sibling(&format!("plane{plane}_iter{iteration:02}_{axis}.csv"))
    }
}
