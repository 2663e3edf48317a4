//! Client-side download of a conversion result.
//!
//! A [`DownloadArtifact`] is the blob a browser would hand to "save as": the
//! result bytes, a MIME type, and a filename derived from the input file and
//! the active [`OutputFormat`]. Building one never touches controller state;
//! saving one writes into a directory with temp-file + rename so a reader
//! never observes a half-written file.

use crate::error::ConvertError;
use crate::format::OutputFormat;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// A downloadable result: bytes tagged with a MIME type and a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadArtifact {
    pub filename: String,
    pub mime_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl DownloadArtifact {
    /// Build the artifact for `result` converted from `source_name`.
    pub fn new(source_name: &str, format: OutputFormat, result: &str) -> Self {
        Self {
            filename: format.download_filename(source_name),
            mime_type: format.mime_type(),
            bytes: result.as_bytes().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the artifact as `dir/<filename>` and return the final path.
    ///
    /// `dir` is created if missing. An existing file with the same name is
    /// replaced.
    pub async fn save_in(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
        let dir = dir.as_ref().to_path_buf();
        let target = dir.join(&self.filename);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ConvertError::OutputWriteFailed {
                path: target.clone(),
                source: e,
            })?;

        let bytes = self.bytes.clone();
        let dest = target.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &dest, &bytes))
            .await
            .map_err(|e| ConvertError::Internal(format!("Save task panicked: {e}")))??;

        info!("Saved {} ({} bytes, {})", target.display(), self.len(), self.mime_type);
        Ok(target)
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let fail = |source: std::io::Error| ConvertError::OutputWriteFailed {
        path: target.to_path_buf(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".pdfconvert-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(fail)?;
    tmp.write_all(bytes).map_err(fail)?;
    tmp.flush().map_err(fail)?;
    tmp.persist(target).map_err(|e| fail(e.error))?;
    Ok(())
}
