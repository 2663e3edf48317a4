//! The user-selected input file.
//!
//! A [`SelectedFile`] is the whole PDF held in memory: its display name, its
//! bytes and its declared media type. It can come from a byte buffer the
//! host already has, a local path, or an HTTP/HTTPS URL. Every route looks
//! for the `%PDF` header within the first KiB so a mislabelled upload is
//! rejected at selection time instead of failing later inside the
//! conversion service.

use crate::error::ConvertError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Media type every selected file must declare.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// The header may appear anywhere in the first KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A PDF chosen by the user. Cheap to clone: the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    /// Wrap an in-memory buffer declared as `application/pdf`.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self, ConvertError> {
        Self::with_media_type(name, PDF_MEDIA_TYPE, bytes)
    }

    /// Wrap an in-memory buffer with an explicit declared media type.
    ///
    /// Both the media type and the magic bytes must say PDF.
    pub fn with_media_type(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self, ConvertError> {
        let name = name.into();
        let media_type = media_type.into();
        let bytes: Vec<u8> = bytes.into();

        if !media_type.eq_ignore_ascii_case(PDF_MEDIA_TYPE) || !is_pdf(&bytes) {
            return Err(ConvertError::NotAPdf { name });
        }

        Ok(Self {
            name,
            media_type: PDF_MEDIA_TYPE.to_string(),
            bytes: bytes.into(),
        })
    }

    /// Load a local path or download an HTTP/HTTPS URL.
    pub async fn load(input: &str, timeout_secs: u64) -> Result<Self, ConvertError> {
        if is_url(input) {
            download_url(input, timeout_secs).await
        } else {
            read_local(Path::new(input)).await
        }
    }

    /// File name as shown to the user (no directory part).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared media type; always [`PDF_MEDIA_TYPE`].
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes, for moving into blocking tasks.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn is_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

async fn read_local(path: &Path) -> Result<SelectedFile, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = display_name(path);
    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    SelectedFile::from_bytes(name, bytes)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SelectedFile, ConvertError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| ConvertError::DownloadFailed {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    info!("Downloaded {} bytes", bytes.len());
    SelectedFile::from_bytes(filename_from_url(url), bytes.to_vec())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| PathBuf::from(path).to_string_lossy().into_owned())
}

/// Last path segment of a URL when it looks like a file name.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn accepts_pdf_bytes() {
        let f = SelectedFile::from_bytes("invoice.pdf", MINIMAL_PDF).unwrap();
        assert_eq!(f.name(), "invoice.pdf");
        assert_eq!(f.media_type(), PDF_MEDIA_TYPE);
        assert_eq!(f.len(), MINIMAL_PDF.len());
    }

    #[test]
    fn rejects_wrong_magic() {
        let err = SelectedFile::from_bytes("notes.pdf", b"hello world".to_vec()).unwrap_err();
        assert!(matches!(err, ConvertError::NotAPdf { ref name } if name == "notes.pdf"));
    }

    #[test]
    fn accepts_header_after_leading_junk() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF, b'\n'];
        bytes.extend_from_slice(MINIMAL_PDF);
        assert!(SelectedFile::from_bytes("bom.pdf", bytes).is_ok());
    }

    #[test]
    fn rejects_header_past_first_kib() {
        let mut bytes = vec![b' '; 1024];
        bytes.extend_from_slice(MINIMAL_PDF);
        let err = SelectedFile::from_bytes("late.pdf", bytes).unwrap_err();
        assert!(matches!(err, ConvertError::NotAPdf { .. }));
    }

    #[test]
    fn rejects_wrong_media_type() {
        let err = SelectedFile::with_media_type("a.pdf", "text/plain", MINIMAL_PDF).unwrap_err();
        assert!(matches!(err, ConvertError::NotAPdf { .. }));
    }

    #[test]
    fn media_type_is_case_insensitive() {
        assert!(SelectedFile::with_media_type("a.pdf", "Application/PDF", MINIMAL_PDF).is_ok());
    }

    #[test]
    fn filename_from_url_uses_last_segment() {
        assert_eq!(filename_from_url("https://arxiv.org/pdf/paper.pdf"), "paper.pdf");
        assert_eq!(filename_from_url("https://arxiv.org/pdf/1706.03762"), "1706.03762");
        assert_eq!(filename_from_url("https://example.com/"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        std::fs::File::create(&path).unwrap().write_all(MINIMAL_PDF).unwrap();

        let f = SelectedFile::load(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(f.name(), "report.pdf");
        assert_eq!(f.bytes(), MINIMAL_PDF);
    }

    #[tokio::test]
    async fn load_missing_file() {
        let err = SelectedFile::load("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}
