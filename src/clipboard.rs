//! Clipboard output boundary.
//!
//! The controller writes through the [`ClipboardSink`] trait so it can be
//! driven by the real system clipboard, a terminal emulator, or a test
//! double. [`SystemClipboard`] (feature `clipboard`) is backed by arboard.

/// Destination for "copy result" actions.
pub trait ClipboardSink: Send {
    /// Replace the clipboard contents with `text`.
    ///
    /// On failure return a short description; the controller surfaces it as
    /// a clipboard error without touching the conversion result.
    fn set_text(&mut self, text: &str) -> Result<(), String>;
}

/// The operating-system clipboard.
///
/// arboard opens the platform clipboard lazily on each write. On headless
/// Linux (no X11/Wayland) every write fails, which surfaces as a normal
/// clipboard error.
#[cfg(feature = "clipboard")]
#[derive(Debug, Default)]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| format!("Failed to initialize clipboard: {e}"))?;
        clipboard
            .set_text(text)
            .map_err(|e| format!("Failed to set clipboard text: {e}"))
    }
}

/// A clipboard that keeps the last copied text in memory.
///
/// Useful for hosts with no system clipboard and in tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    contents: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text most recently written, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl ClipboardSink for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), String> {
        let mut slot = self
            .contents
            .lock()
            .map_err(|_| "clipboard lock poisoned".to_string())?;
        *slot = Some(text.to_string());
        Ok(())
    }
}
