//! Output formats and their fixed MIME-type / extension table.
//!
//! The mapping is a static table rather than something inferred at runtime,
//! so every format can be checked exhaustively in tests. The DOCX and CSV
//! entries are advisory: the conversion service returns *text*, which is
//! saved with the binary format's MIME type and extension as-is.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target representation chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text (default).
    #[default]
    Text,
    /// Word-processor document (text approximation).
    Docx,
    /// Spreadsheet as comma-separated values.
    Csv,
    /// Hypertext.
    Html,
    /// Markdown.
    Markdown,
    /// Structured JSON.
    Json,
}

struct FormatInfo {
    id: &'static str,
    label: &'static str,
    mime: &'static str,
    extension: &'static str,
}

const TEXT: FormatInfo = FormatInfo {
    id: "text",
    label: "Plain Text",
    mime: "text/plain",
    extension: "txt",
};
const DOCX: FormatInfo = FormatInfo {
    id: "docx",
    label: "Word Document",
    mime: "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    extension: "docx",
};
const CSV: FormatInfo = FormatInfo {
    id: "csv",
    label: "CSV Spreadsheet",
    mime: "text/csv",
    extension: "csv",
};
const HTML: FormatInfo = FormatInfo {
    id: "html",
    label: "HTML",
    mime: "text/html",
    extension: "html",
};
const MARKDOWN: FormatInfo = FormatInfo {
    id: "markdown",
    label: "Markdown",
    mime: "text/markdown",
    extension: "md",
};
const JSON: FormatInfo = FormatInfo {
    id: "json",
    label: "JSON",
    mime: "application/json",
    extension: "json",
};

impl OutputFormat {
    /// Every format, in menu order.
    pub const ALL: [OutputFormat; 6] = [
        OutputFormat::Text,
        OutputFormat::Docx,
        OutputFormat::Csv,
        OutputFormat::Html,
        OutputFormat::Markdown,
        OutputFormat::Json,
    ];

    fn info(self) -> &'static FormatInfo {
        match self {
            OutputFormat::Text => &TEXT,
            OutputFormat::Docx => &DOCX,
            OutputFormat::Csv => &CSV,
            OutputFormat::Html => &HTML,
            OutputFormat::Markdown => &MARKDOWN,
            OutputFormat::Json => &JSON,
        }
    }

    /// Stable identifier used in filenames, on the CLI and on the wire.
    pub fn id(self) -> &'static str {
        self.info().id
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// MIME type attached to a downloaded result.
    pub fn mime_type(self) -> &'static str {
        self.info().mime
    }

    /// File extension (without the dot) of a downloaded result.
    pub fn extension(self) -> &'static str {
        self.info().extension
    }

    /// `true` for formats whose payload is prose-like text that should end
    /// with a newline when saved.
    pub fn is_line_oriented(self) -> bool {
        matches!(
            self,
            OutputFormat::Text | OutputFormat::Docx | OutputFormat::Csv | OutputFormat::Markdown
        )
    }

    /// Derive the download filename for an input file.
    ///
    /// The last extension of `source_name` is stripped and
    /// `-<id>.<extension>` appended: `report.pdf` → `report-markdown.md`.
    /// A name without an extension is used whole; a leading dot (hidden
    /// file) is not treated as an extension separator.
    pub fn download_filename(self, source_name: &str) -> String {
        let base = match source_name.rfind('.') {
            Some(pos) if pos > 0 => &source_name[..pos],
            _ => source_name,
        };
        format!("{}-{}.{}", base, self.id(), self.extension())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Returned when a string names no known format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown output format '{0}' (expected one of: text, docx, csv, html, markdown, json)")]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "txt" | "plain" | "plain-text" => Ok(OutputFormat::Text),
            "docx" | "word" | "doc" => Ok(OutputFormat::Docx),
            "csv" | "spreadsheet" | "excel" => Ok(OutputFormat::Csv),
            "html" | "htm" | "hypertext" => Ok(OutputFormat::Html),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}
