//! System prompts for VLM-based PDF conversion, one per output format.
//!
//! Every prompt shares the same preamble (read every page, keep reading
//! order, no commentary) and adds the rules of its target format. The
//! DOCX and CSV prompts ask for *text* approximations: plain paragraphs for
//! a word-processor document, comma-separated rows for a spreadsheet.
//!
//! Callers can override the prompt via
//! [`crate::config::RequesterConfig::system_prompt`].

use crate::format::OutputFormat;

const PREAMBLE: &str = r#"You are an expert document converter. You receive the pages of a PDF document as images, in order. Convert the WHOLE document into the requested output format.

General rules:
- Preserve ALL text content completely and accurately, in human reading order
- Ignore page numbers, repeated headers/footers and decorative elements
- Output ONLY the converted document
- Do NOT wrap the output in code fences
- Do NOT add commentary, explanations or "Page X of Y" markers"#;

const TEXT_RULES: &str = r#"

Output format: PLAIN TEXT
- No markup of any kind
- Separate paragraphs with one blank line
- Render tables as aligned columns separated by spaces"#;

const DOCX_RULES: &str = r#"

Output format: WORD DOCUMENT TEXT
- Produce clean paragraphs suitable for pasting into a word processor
- Put each heading on its own line, followed by a blank line
- Render lists with "•" bullets or "1." numbers
- Render tables as tab-separated rows"#;

const CSV_RULES: &str = r#"

Output format: CSV
- Extract the tabular data of the document as RFC 4180 CSV
- The first row is the header row
- Quote fields that contain commas, quotes or line breaks; double inner quotes
- When several tables exist, separate them with one empty line
- When the document has no table, output one column named "text" with one row per paragraph"#;

const HTML_RULES: &str = r#"

Output format: HTML
- Produce a complete HTML5 document (<!DOCTYPE html>, <html>, <head> with <meta charset="utf-8"> and <title>, <body>)
- Use semantic elements: <h1>-<h4>, <p>, <ul>/<ol>, <table> with <thead>/<tbody>
- No inline styles, no scripts, no external resources"#;

const MARKDOWN_RULES: &str = r#"

Output format: MARKDOWN
- Use # for the document title, ## for sections, ### for subsections
- Use - for unordered lists and 1. for ordered lists, preserving nesting
- Convert tables to GFM pipe tables
- Render mathematical expressions using LaTeX: $inline$ and $$display$$"#;

const JSON_RULES: &str = r#"

Output format: JSON
- Output a single valid JSON object, nothing else
- Use this shape: {"title": string|null, "sections": [{"heading": string|null, "paragraphs": [string], "tables": [{"headers": [string], "rows": [[string]]}]}]}
- Put key/value data that is clearly labelled (totals, dates, identifiers) in an extra "fields" object"#;

/// Default system prompt for converting a document into `format`.
pub fn system_prompt(format: OutputFormat) -> String {
    let rules = match format {
        OutputFormat::Text => TEXT_RULES,
        OutputFormat::Docx => DOCX_RULES,
        OutputFormat::Csv => CSV_RULES,
        OutputFormat::Html => HTML_RULES,
        OutputFormat::Markdown => MARKDOWN_RULES,
        OutputFormat::Json => JSON_RULES,
    };
    format!("{PREAMBLE}{rules}")
}

/// User-turn text accompanying the page images.
pub fn user_instruction(format: OutputFormat, file_name: &str, page_count: usize) -> String {
    format!(
        "Convert \"{}\" ({} page{}) to {}.",
        file_name,
        page_count,
        if page_count == 1 { "" } else { "s" },
        format.label()
    )
}
