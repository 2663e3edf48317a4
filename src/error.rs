//! Error types for the edgequake-pdfconvert library.
//!
//! Two error types reflect two different owners of a failure:
//!
//! * [`ConvertError`]: everything the controller, the session and the file
//!   helpers can report to a caller. Every variant ends the current attempt
//!   only; the controller is always left ready to retry.
//!
//! * [`RequestError`]: the failure of a single call to the external
//!   conversion service. It carries an *optional* human-readable message
//!   because services do not always send one. The controller turns it into
//!   [`ConvertError::RequestFailed`], substituting [`FALLBACK_REQUEST_MESSAGE`]
//!   when the message is absent or blank.

use std::path::PathBuf;
use thiserror::Error;

/// Message surfaced when conversion is started without a selected file.
pub const MISSING_INPUT_MESSAGE: &str = "Please upload a PDF file.";

/// Message surfaced when a selected file is not a PDF.
pub const NOT_A_PDF_MESSAGE: &str = "Please select a valid PDF file.";

/// Message surfaced when the service failed without saying why.
pub const FALLBACK_REQUEST_MESSAGE: &str = "Conversion failed. Please try again.";

/// Message surfaced when the clipboard rejects a write.
pub const CLIPBOARD_FAILURE_MESSAGE: &str = "Failed to copy to clipboard.";

/// All errors returned by the edgequake-pdfconvert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Controller errors ─────────────────────────────────────────────────
    /// Conversion requested with no file selected.
    #[error("{}", MISSING_INPUT_MESSAGE)]
    MissingInput,

    /// The selected file is not a PDF (wrong media type or magic bytes).
    #[error("'{name}' is not a PDF file")]
    NotAPdf { name: String },

    /// An action was attempted while a conversion is in flight.
    #[error("A conversion is already in progress")]
    Busy,

    /// The conversion service failed; `message` is what the user sees.
    #[error("{message}")]
    RequestFailed { message: String },

    /// Writing to the clipboard failed.
    #[error("{}: {detail}", CLIPBOARD_FAILURE_MESSAGE)]
    ClipboardFailed { detail: String },

    /// Copy requested but there is no result (or a conversion is running).
    #[error("Nothing to copy: no conversion result is available")]
    NothingToCopy,

    /// Download requested but there is no result or no file.
    #[error("Nothing to download: a file and a conversion result are required")]
    NothingToDownload,

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the downloaded artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Session errors ────────────────────────────────────────────────────
    /// The session task has stopped; no further commands are accepted.
    #[error("Conversion session is closed")]
    SessionClosed,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of one call to the external conversion service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", surfaced(.message))]
pub struct RequestError {
    /// Human-readable reason, if the service supplied one.
    pub message: Option<String>,
}

impl RequestError {
    /// A failure with a message the user should see verbatim.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A failure with no usable message.
    pub fn without_message() -> Self {
        Self { message: None }
    }

    /// The message shown to the user: the service's own text when present
    /// and non-blank, otherwise [`FALLBACK_REQUEST_MESSAGE`].
    pub fn user_message(&self) -> String {
        surfaced(&self.message)
    }
}

fn surfaced(message: &Option<String>) -> String {
    match message.as_deref() {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => FALLBACK_REQUEST_MESSAGE.to_string(),
    }
}

impl From<RequestError> for ConvertError {
    fn from(e: RequestError) -> Self {
        ConvertError::RequestFailed {
            message: e.user_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_display() {
        assert_eq!(ConvertError::MissingInput.to_string(), "Please upload a PDF file.");
    }

    #[test]
    fn request_error_keeps_message_verbatim() {
        let e = RequestError::new("Service unavailable");
        assert_eq!(e.user_message(), "Service unavailable");
        let converted: ConvertError = e.into();
        assert_eq!(converted.to_string(), "Service unavailable");
    }

    #[test]
    fn request_error_falls_back_when_blank() {
        assert_eq!(RequestError::without_message().user_message(), FALLBACK_REQUEST_MESSAGE);
        assert_eq!(RequestError::new("   ").user_message(), FALLBACK_REQUEST_MESSAGE);
    }

    #[test]
    fn clipboard_failed_display() {
        let e = ConvertError::ClipboardFailed {
            detail: "no display".into(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with(CLIPBOARD_FAILURE_MESSAGE), "got: {msg}");
        assert!(msg.contains("no display"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = ConvertError::NotAPdf {
            name: "notes.txt".into(),
        };
        assert_eq!(e.to_string(), "'notes.txt' is not a PDF file");
    }
}
