//! The interaction controller: a synchronous state machine.
//!
//! The controller owns every piece of UI state: selected file, selected
//! format, loading flag, simulated progress, result, error, and the copy
//! acknowledgement. Each user action and each timer or request event is one
//! method call. It never sleeps, spawns or performs network I/O; the async
//! [`crate::session::Session`] decides *when* events happen, the controller
//! decides *what* they do.
//!
//! ## Phases
//!
//! ```text
//!            select_file / select_format
//!                 ┌──────┐
//!                 ▼      │
//!   ┌────────▶  Idle ────┘
//!   │             │ begin_conversion (file present)
//!   │             ▼
//!   │          Loading ──tick──▶ Loading   (progress += 5, max 95)
//!   │          │      │
//!   │   resolve(Ok)  resolve(Err)
//!   │          ▼      ▼
//!   │   Succeeded    Failed     (loading stays set)
//!   │          │      │
//!   └──settle──┴──────┘         (loading cleared, outcome kept)
//! ```
//!
//! Succeeded and Failed accept `begin_conversion` again once settled.
//!
//! ## Invariants
//!
//! * `result` and `error` are never both present.
//! * Progress never decreases during one attempt and stays at or below the
//!   configured ceiling until the request resolves; success forces 100.
//! * While `loading` is set, format and file selection are no-ops and a new
//!   conversion is rejected.

use crate::clipboard::ClipboardSink;
use crate::config::SessionConfig;
use crate::download::DownloadArtifact;
use crate::error::{ConvertError, RequestError, CLIPBOARD_FAILURE_MESSAGE, NOT_A_PDF_MESSAGE};
use crate::file::SelectedFile;
use crate::format::OutputFormat;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Coarse state of the conversion workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Everything the session needs to issue one request.
///
/// `attempt` identifies the conversion so events from an older attempt can
/// be told apart from the current one.
#[derive(Debug, Clone)]
pub struct ConversionTicket {
    pub attempt: u64,
    pub file: SelectedFile,
    pub format: OutputFormat,
}

/// Read-only copy of the controller state for observers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub loading: bool,
    pub progress: u8,
    pub format: OutputFormat,
    pub file_name: Option<String>,
    pub result: Option<String>,
    pub error: Option<String>,
    /// Transient clipboard failure message. Kept apart from `error` so a
    /// failed copy never hides the result it tried to copy.
    pub clipboard_error: Option<String>,
    pub copied: bool,
}

impl Snapshot {
    /// `true` when the convert action would be accepted.
    pub fn can_convert(&self) -> bool {
        self.file_name.is_some() && !self.loading
    }

    /// `true` when the copy action would be accepted.
    pub fn can_copy(&self) -> bool {
        self.result.is_some() && !self.loading
    }

    /// `true` when the download action would be accepted.
    pub fn can_download(&self) -> bool {
        self.result.is_some() && self.file_name.is_some() && !self.loading
    }
}

/// The interaction controller.
#[derive(Debug)]
pub struct Controller {
    config: SessionConfig,
    file: Option<SelectedFile>,
    format: OutputFormat,
    phase: Phase,
    loading: bool,
    progress: u8,
    result: Option<String>,
    error: Option<String>,
    clipboard_error: Option<String>,
    copied: bool,
    attempt: u64,
    copy_generation: u64,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Controller {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            file: None,
            format: OutputFormat::default(),
            phase: Phase::Idle,
            loading: false,
            progress: 0,
            result: None,
            error: None,
            clipboard_error: None,
            copied: false,
            attempt: 0,
            copy_generation: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn clipboard_error(&self) -> Option<&str> {
        self.clipboard_error.as_deref()
    }

    pub fn copied(&self) -> bool {
        self.copied
    }

    /// Identifier of the most recent conversion attempt (0 before the first).
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            loading: self.loading,
            progress: self.progress,
            format: self.format,
            file_name: self.file.as_ref().map(|f| f.name().to_string()),
            result: self.result.clone(),
            error: self.error.clone(),
            clipboard_error: self.clipboard_error.clone(),
            copied: self.copied,
        }
    }

    // ── User actions ─────────────────────────────────────────────────────

    /// Replace the selected file and clear any previous outcome.
    ///
    /// Returns `false` without touching state while loading.
    pub fn select_file(&mut self, file: SelectedFile) -> bool {
        if self.loading {
            debug!("Ignoring file selection while loading");
            return false;
        }
        info!("Selected file '{}' ({} bytes)", file.name(), file.len());
        self.file = Some(file);
        self.clear_outcome();
        true
    }

    /// Record a selection the input boundary refused (not a PDF).
    ///
    /// The previous file, if any, stays selected. A no-op while loading.
    pub fn reject_file(&mut self, name: &str) -> ConvertError {
        if !self.loading {
            warn!("Rejected non-PDF selection '{}'", name);
            self.clear_outcome();
            self.error = Some(NOT_A_PDF_MESSAGE.to_string());
        }
        ConvertError::NotAPdf {
            name: name.to_string(),
        }
    }

    /// Change the active output format. Returns `false` (no-op) while loading.
    pub fn select_format(&mut self, format: OutputFormat) -> bool {
        if self.loading {
            debug!("Ignoring format change to {} while loading", format);
            return false;
        }
        self.format = format;
        true
    }

    /// Enter `Loading` for the selected file and format.
    ///
    /// # Errors
    /// * [`ConvertError::Busy`] while a conversion is in flight or settling;
    ///   state is unchanged.
    /// * [`ConvertError::MissingInput`] when no file is selected; the error
    ///   message is surfaced and the controller stays out of `Loading`.
    pub fn begin_conversion(&mut self) -> Result<ConversionTicket, ConvertError> {
        if self.loading {
            return Err(ConvertError::Busy);
        }
        let Some(file) = self.file.clone() else {
            self.clear_outcome();
            self.error = Some(ConvertError::MissingInput.to_string());
            return Err(ConvertError::MissingInput);
        };

        self.attempt += 1;
        self.phase = Phase::Loading;
        self.loading = true;
        self.progress = 0;
        self.clear_outcome();
        info!(
            "Conversion #{} started: '{}' → {}",
            self.attempt,
            file.name(),
            self.format
        );

        Ok(ConversionTicket {
            attempt: self.attempt,
            file,
            format: self.format,
        })
    }

    /// Copy the result to `clipboard`.
    ///
    /// On success `copied` is set and the returned generation must be passed
    /// to [`Controller::expire_copied`] when the acknowledgement window ends.
    /// On failure the clipboard message is surfaced; the result is kept.
    pub fn copy_result(&mut self, clipboard: &mut dyn ClipboardSink) -> Result<u64, ConvertError> {
        if self.loading {
            return Err(ConvertError::Busy);
        }
        let Some(result) = self.result.as_deref() else {
            return Err(ConvertError::NothingToCopy);
        };

        match clipboard.set_text(result) {
            Ok(()) => {
                self.clipboard_error = None;
                self.copied = true;
                self.copy_generation += 1;
                debug!("Copied {} bytes to clipboard", result.len());
                Ok(self.copy_generation)
            }
            Err(detail) => {
                warn!("Clipboard write failed: {}", detail);
                self.copied = false;
                self.clipboard_error = Some(CLIPBOARD_FAILURE_MESSAGE.to_string());
                Err(ConvertError::ClipboardFailed { detail })
            }
        }
    }

    /// Build the download blob for the current result. Never mutates state.
    pub fn download_artifact(&self) -> Result<DownloadArtifact, ConvertError> {
        if self.loading {
            return Err(ConvertError::Busy);
        }
        match (self.file.as_ref(), self.result.as_deref()) {
            (Some(file), Some(result)) => Ok(DownloadArtifact::new(file.name(), self.format, result)),
            _ => Err(ConvertError::NothingToDownload),
        }
    }

    // ── Session events ───────────────────────────────────────────────────

    /// Advance the simulated progress by one tick.
    ///
    /// Returns `true` if progress changed. Ticks outside `Loading` are
    /// ignored so a late tick can never alter a finished attempt.
    pub fn tick(&mut self) -> bool {
        if self.phase != Phase::Loading {
            return false;
        }
        let ceiling = self.config.progress_ceiling;
        let next = self
            .progress
            .saturating_add(self.config.tick_increment)
            .min(ceiling)
            .max(self.progress);
        let changed = next != self.progress;
        self.progress = next;
        changed
    }

    /// Apply the outcome of attempt `attempt`.
    ///
    /// Outcomes for any attempt other than the current in-flight one are
    /// dropped and `false` is returned.
    pub fn resolve(&mut self, attempt: u64, outcome: Result<String, RequestError>) -> bool {
        if self.phase != Phase::Loading || attempt != self.attempt {
            debug!("Dropping stale outcome for attempt #{}", attempt);
            return false;
        }
        match outcome {
            Ok(text) => {
                info!("Conversion #{} succeeded ({} bytes)", attempt, text.len());
                self.phase = Phase::Succeeded;
                self.progress = 100;
                self.error = None;
                self.result = Some(text);
            }
            Err(e) => {
                let message = e.user_message();
                warn!("Conversion #{} failed: {}", attempt, message);
                self.phase = Phase::Failed;
                self.result = None;
                self.error = Some(message);
            }
        }
        true
    }

    /// End the settle delay: clear the loading flag, keep the outcome.
    pub fn settle(&mut self, attempt: u64) -> bool {
        if attempt != self.attempt || !matches!(self.phase, Phase::Succeeded | Phase::Failed) {
            return false;
        }
        self.loading = false;
        debug!("Conversion #{} settled", attempt);
        true
    }

    /// End the "copied" acknowledgement started by copy `generation`.
    ///
    /// A newer copy restarts the window, so older generations are ignored.
    pub fn expire_copied(&mut self, generation: u64) -> bool {
        if generation != self.copy_generation || !self.copied {
            return false;
        }
        self.copied = false;
        true
    }

    fn clear_outcome(&mut self) {
        self.result = None;
        self.error = None;
        self.clipboard_error = None;
        self.copied = false;
        if !self.loading {
            self.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;

    const PDF: &[u8] = b"%PDF-1.7\n%%EOF\n";

    fn pdf(name: &str) -> SelectedFile {
        SelectedFile::from_bytes(name, PDF).unwrap()
    }

    struct BrokenClipboard;

    impl ClipboardSink for BrokenClipboard {
        fn set_text(&mut self, _text: &str) -> Result<(), String> {
            Err("no display".into())
        }
    }

    fn assert_exclusive(c: &Controller) {
        assert!(
            !(c.result().is_some() && c.error().is_some()),
            "result and error both set: {:?}",
            c.snapshot()
        );
    }

    fn finished(result: &str) -> Controller {
        let mut c = Controller::default();
        c.select_file(pdf("invoice.pdf"));
        let t = c.begin_conversion().unwrap();
        c.resolve(t.attempt, Ok(result.to_string()));
        c.settle(t.attempt);
        c
    }

    #[test]
    fn starts_idle_with_plain_text() {
        let c = Controller::default();
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.format(), OutputFormat::Text);
        assert!(!c.is_loading());
        assert_eq!(c.progress(), 0);
    }

    #[test]
    fn missing_input_never_loads() {
        let mut c = Controller::default();
        let err = c.begin_conversion().unwrap_err();
        assert!(matches!(err, ConvertError::MissingInput));
        assert_eq!(c.error(), Some("Please upload a PDF file."));
        assert_eq!(c.phase(), Phase::Idle);
        assert!(!c.is_loading());
        assert_eq!(c.attempt(), 0);
    }

    #[test]
    fn begin_resets_progress_and_outcome() {
        let mut c = finished("old");
        assert_eq!(c.progress(), 100);
        let t = c.begin_conversion().unwrap();
        assert_eq!(t.attempt, 2);
        assert_eq!(c.phase(), Phase::Loading);
        assert_eq!(c.progress(), 0);
        assert_eq!(c.result(), None);
        assert_eq!(c.error(), None);
    }

    #[test]
    fn format_selection_is_noop_while_loading() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        c.begin_conversion().unwrap();
        let before = c.snapshot();
        for format in OutputFormat::ALL {
            assert!(!c.select_format(format));
            assert_eq!(c.snapshot(), before);
        }
    }

    #[test]
    fn file_selection_is_noop_while_loading() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        c.begin_conversion().unwrap();
        assert!(!c.select_file(pdf("b.pdf")));
        assert_eq!(c.file().unwrap().name(), "a.pdf");
    }

    #[test]
    fn second_start_while_loading_is_busy_and_unchanged() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        c.begin_conversion().unwrap();
        c.tick();
        let before = c.snapshot();
        assert!(matches!(c.begin_conversion(), Err(ConvertError::Busy)));
        assert_eq!(c.snapshot(), before);
        assert_eq!(c.attempt(), 1);
    }

    #[test]
    fn progress_is_monotonic_and_capped() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        let t = c.begin_conversion().unwrap();
        let mut last = c.progress();
        for _ in 0..50 {
            c.tick();
            assert!(c.progress() >= last);
            assert!(c.progress() <= 95);
            last = c.progress();
        }
        assert_eq!(c.progress(), 95);
        assert!(!c.tick(), "tick at the ceiling changes nothing");

        c.resolve(t.attempt, Ok("done".into()));
        assert_eq!(c.progress(), 100);
    }

    #[test]
    fn ticks_after_resolution_are_ignored() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        let t = c.begin_conversion().unwrap();
        c.tick();
        c.resolve(t.attempt, Err(RequestError::new("boom")));
        let p = c.progress();
        assert!(!c.tick());
        assert_eq!(c.progress(), p);
    }

    #[test]
    fn success_scenario() {
        let mut c = Controller::default();
        c.select_file(pdf("invoice.pdf"));
        let t = c.begin_conversion().unwrap();
        c.tick();
        assert!(c.resolve(t.attempt, Ok("Total: $42".into())));
        assert_eq!(c.phase(), Phase::Succeeded);
        assert_eq!(c.result(), Some("Total: $42"));
        assert_eq!(c.error(), None);
        assert_eq!(c.progress(), 100);
        assert!(c.is_loading(), "loading flag holds until settled");

        assert!(c.settle(t.attempt));
        assert!(!c.is_loading());
        assert_eq!(c.result(), Some("Total: $42"));
    }

    #[test]
    fn failure_scenario() {
        let mut c = Controller::default();
        c.select_file(pdf("invoice.pdf"));
        c.select_format(OutputFormat::Json);
        let t = c.begin_conversion().unwrap();
        c.resolve(t.attempt, Err(RequestError::new("Service unavailable")));
        c.settle(t.attempt);
        assert_eq!(c.phase(), Phase::Failed);
        assert_eq!(c.error(), Some("Service unavailable"));
        assert_eq!(c.result(), None);
        assert!(!c.is_loading());
    }

    #[test]
    fn failure_without_message_uses_fallback() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        let t = c.begin_conversion().unwrap();
        c.resolve(t.attempt, Err(RequestError::without_message()));
        assert_eq!(c.error(), Some(crate::error::FALLBACK_REQUEST_MESSAGE));
    }

    #[test]
    fn stale_outcome_is_dropped() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        let t = c.begin_conversion().unwrap();
        assert!(!c.resolve(t.attempt + 7, Ok("wrong".into())));
        assert_eq!(c.phase(), Phase::Loading);
        assert!(c.resolve(t.attempt, Ok("right".into())));
        assert!(!c.resolve(t.attempt, Ok("again".into())));
        assert_eq!(c.result(), Some("right"));
    }

    #[test]
    fn new_file_clears_result_and_error() {
        let mut c = finished("Total: $42");
        assert!(c.select_file(pdf("next.pdf")));
        assert_eq!(c.result(), None);
        assert_eq!(c.error(), None);
        assert_eq!(c.phase(), Phase::Idle);

        let mut c = Controller::default();
        let _ = c.begin_conversion();
        assert!(c.error().is_some());
        c.select_file(pdf("a.pdf"));
        assert_eq!(c.error(), None);
    }

    #[test]
    fn rejected_file_keeps_previous_selection() {
        let mut c = finished("text");
        let err = c.reject_file("notes.txt");
        assert!(matches!(err, ConvertError::NotAPdf { .. }));
        assert_eq!(c.file().unwrap().name(), "invoice.pdf");
        assert_eq!(c.error(), Some(NOT_A_PDF_MESSAGE));
        assert_exclusive(&c);
    }

    #[test]
    fn copy_sets_and_expires_acknowledgement() {
        let mut c = finished("Total: $42");
        let clip = MemoryClipboard::new();
        let mut sink = clip.clone();

        let generation = c.copy_result(&mut sink).unwrap();
        assert!(c.copied());
        assert_eq!(clip.contents().as_deref(), Some("Total: $42"));

        assert!(c.expire_copied(generation));
        assert!(!c.copied());
        assert_eq!(c.result(), Some("Total: $42"));
    }

    #[test]
    fn older_copy_window_does_not_clear_newer_one() {
        let mut c = finished("x");
        let mut sink = MemoryClipboard::new();
        let first = c.copy_result(&mut sink).unwrap();
        let second = c.copy_result(&mut sink).unwrap();
        assert!(!c.expire_copied(first));
        assert!(c.copied());
        assert!(c.expire_copied(second));
    }

    #[test]
    fn clipboard_failure_keeps_result() {
        let mut c = finished("Total: $42");
        let err = c.copy_result(&mut BrokenClipboard).unwrap_err();
        assert!(matches!(err, ConvertError::ClipboardFailed { .. }));
        assert_eq!(c.result(), Some("Total: $42"));
        assert_eq!(c.clipboard_error(), Some(CLIPBOARD_FAILURE_MESSAGE));
        assert!(!c.copied());
        assert_exclusive(&c);
    }

    #[test]
    fn copy_requires_result_and_not_loading() {
        let mut c = Controller::default();
        let mut sink = MemoryClipboard::new();
        assert!(matches!(c.copy_result(&mut sink), Err(ConvertError::NothingToCopy)));

        c.select_file(pdf("a.pdf"));
        let t = c.begin_conversion().unwrap();
        c.resolve(t.attempt, Ok("r".into()));
        assert!(matches!(c.copy_result(&mut sink), Err(ConvertError::Busy)));
    }

    #[test]
    fn download_does_not_mutate_state() {
        let c = finished("Total: $42");
        let before = c.snapshot();
        let artifact = c.download_artifact().unwrap();
        assert_eq!(artifact.filename, "invoice-text.txt");
        assert_eq!(artifact.mime_type, "text/plain");
        assert_eq!(artifact.bytes, b"Total: $42");
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn download_filename_follows_active_format() {
        let mut c = Controller::default();
        c.select_file(pdf("report.pdf"));
        c.select_format(OutputFormat::Markdown);
        let t = c.begin_conversion().unwrap();
        c.resolve(t.attempt, Ok("# Report".into()));
        c.settle(t.attempt);
        assert_eq!(c.download_artifact().unwrap().filename, "report-markdown.md");
    }

    #[test]
    fn download_requires_result() {
        let mut c = Controller::default();
        c.select_file(pdf("a.pdf"));
        assert!(matches!(
            c.download_artifact(),
            Err(ConvertError::NothingToDownload)
        ));
    }

    #[test]
    fn result_and_error_never_coexist_across_a_session() {
        let mut c = Controller::default();
        let mut sink = MemoryClipboard::new();
        let _ = c.begin_conversion();
        assert_exclusive(&c);
        c.select_file(pdf("a.pdf"));
        assert_exclusive(&c);
        for (i, outcome) in [
            Ok("one".to_string()),
            Err(RequestError::new("two")),
            Ok("three".to_string()),
        ]
        .into_iter()
        .enumerate()
        {
            let t = c.begin_conversion().unwrap();
            assert_exclusive(&c);
            c.tick();
            c.resolve(t.attempt, outcome);
            assert_exclusive(&c);
            c.settle(t.attempt);
            assert_exclusive(&c);
            if i != 1 {
                c.copy_result(&mut sink).unwrap();
                assert_exclusive(&c);
            }
        }
    }

    #[test]
    fn snapshot_action_guards() {
        let c = finished("r");
        let s = c.snapshot();
        assert!(s.can_convert());
        assert!(s.can_copy());
        assert!(s.can_download());
        assert!(!Controller::default().snapshot().can_convert());
    }
}
