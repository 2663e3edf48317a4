//! # edgequake-pdfconvert
//!
//! Turn a PDF into plain text, DOCX, CSV, HTML, Markdown or JSON with a
//! single call to a conversion service, and drive that call through an
//! interactive session: file and format selection, a simulated progress bar,
//! copy-to-clipboard and download.
//!
//! ## Session Overview
//!
//! ```text
//! select file ─┐
//! select format┤
//!              ▼
//!        ┌───────────┐ start ┌─────────┐ outcome ┌──────────────────────┐
//!        │   Idle    │──────▶│ Loading │────────▶│ Succeeded │ Failed   │
//!        └───────────┘       └─────────┘         └──────────────────────┘
//!                              │  ▲                   │ copy / download
//!                   tick +5 %  └──┘ (≤ 95 %)          ▼
//!                                              clipboard │ file on disk
//! ```
//!
//! * [`Controller`] is the synchronous state machine. Every rule about what
//!   may happen when lives there, and it is unit-tested without a runtime.
//! * [`Session`] owns a controller inside one tokio task and runs the
//!   progress ticker, the request, the settle delay and the copied
//!   acknowledgement as branches of a single `select!` loop.
//! * [`ConversionRequester`] is the seam to the outside world. It is either a
//!   vision LLM fed with rendered pages ([`VisionRequester`]) or an HTTP
//!   conversion endpoint ([`HttpRequester`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfconvert::{
//!     resolve_requester, MemoryClipboard, OutputFormat, RequesterConfig, SelectedFile, Session,
//!     SessionConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / EDGEQUAKE_LLM_PROVIDER
//!     let requester = resolve_requester(&RequesterConfig::default())?;
//!     let session = Session::spawn(
//!         SessionConfig::default(),
//!         requester,
//!         Box::new(MemoryClipboard::new()),
//!     );
//!     let handle = session.handle();
//!
//!     handle.select_file(SelectedFile::load("invoice.pdf", 60).await?).await?;
//!     handle.select_format(OutputFormat::Markdown).await?;
//!     let text = handle.convert().await?;
//!     println!("{text}");
//!
//!     let saved = handle.download(".").await?; // ./invoice-markdown.md
//!     eprintln!("saved to {}", saved.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `pdfconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `clipboard` | on      | Enables [`SystemClipboard`] backed by arboard |
//!
//! Disable both when embedding the library in a headless service:
//! ```toml
//! edgequake-pdfconvert = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clipboard;
pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod file;
pub mod format;
pub mod prompts;
pub mod requester;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clipboard::{ClipboardSink, MemoryClipboard};
#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;
pub use config::{RequesterConfig, RequesterConfigBuilder, SessionConfig, SessionConfigBuilder};
pub use controller::{Controller, ConversionTicket, Phase, Snapshot};
pub use download::DownloadArtifact;
pub use error::{ConvertError, RequestError};
pub use file::SelectedFile;
pub use format::{OutputFormat, UnknownFormat};
pub use requester::{resolve_requester, ConversionRequester, HttpRequester, VisionRequester};
pub use session::{Session, SessionHandle};
