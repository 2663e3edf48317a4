//! CLI binary for edgequake-pdfconvert.
//!
//! A thin shim over the library crate: it maps CLI flags to
//! `RequesterConfig`, drives one `Session` through select → convert →
//! print / download / copy, and renders the session progress as a bar.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfconvert::error::CLIPBOARD_FAILURE_MESSAGE;
use edgequake_pdfconvert::{
    resolve_requester, ClipboardSink, ConvertError, OutputFormat, Phase, RequesterConfig,
    SelectedFile, Session, SessionConfig, SessionHandle, Snapshot,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plain text to stdout
  pdfconvert invoice.pdf

  # Markdown saved next to other exports (writes ./out/invoice-markdown.md)
  pdfconvert --format markdown --output-dir out invoice.pdf

  # CSV copied to the clipboard
  pdfconvert --format csv --copy tables.pdf

  # Use an HTTP conversion service instead of a vision LLM
  pdfconvert --endpoint https://convert.example.com/v1/convert report.pdf

  # Convert from URL with a specific model
  pdfconvert --provider openai --model gpt-4.1 https://arxiv.org/pdf/1706.03762

  # Final session state as JSON
  pdfconvert --json --format html report.pdf > state.json

OUTPUT FORMATS:
  id         download name          MIME type
  ────────   ─────────────────────  ──────────────────────────────────────────────────────────────
  text       <stem>-text.txt        text/plain
  docx       <stem>-docx.docx       application/vnd.openxmlformats-officedocument.wordprocessingml.document
  csv        <stem>-csv.csv         text/csv
  html       <stem>-html.html       text/html
  markdown   <stem>-markdown.md     text/markdown
  json       <stem>-json.json       application/json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFCONVERT_ENDPOINT     HTTP conversion endpoint (skips the LLM)
"#;

/// Convert PDF files and URLs to text, DOCX, CSV, HTML, Markdown or JSON.
#[derive(Parser, Debug)]
#[command(
    name = "pdfconvert",
    version,
    about = "Convert PDF files and URLs to text, DOCX, CSV, HTML, Markdown or JSON",
    long_about = "Convert a PDF document (local file or URL) into one of six output formats with a \
single call to a conversion service: either a vision LLM (OpenAI, Anthropic, Gemini, Ollama, any \
OpenAI-compatible endpoint) or an HTTP conversion endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output format.
    #[arg(short, long, env = "PDFCONVERT_FORMAT", value_enum, default_value = "text")]
    format: FormatArg,

    /// Save the result into this directory under its download name.
    #[arg(short, long, env = "PDFCONVERT_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Copy the result to the system clipboard.
    #[arg(long, env = "PDFCONVERT_COPY")]
    copy: bool,

    /// Print the result to stdout (default unless --output-dir, --copy or --json is given).
    #[arg(long, env = "PDFCONVERT_PRINT")]
    print: bool,

    /// HTTP conversion endpoint; replaces the vision LLM.
    #[arg(long, env = "PDFCONVERT_ENDPOINT")]
    endpoint: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDFCONVERT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens for the whole document.
    #[arg(long, env = "PDFCONVERT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Timeout in seconds for the input download and for the conversion call.
    #[arg(long, env = "PDFCONVERT_TIMEOUT", default_value_t = 180)]
    timeout: u64,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDFCONVERT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Print the final session snapshot as JSON.
    #[arg(long, env = "PDFCONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDFCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDFCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDFCONVERT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Text,
    Docx,
    Csv,
    Html,
    Markdown,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Docx => OutputFormat::Docx,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Html => OutputFormat::Html,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The bar already says everything a user needs while it is visible.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Requester + session ──────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let requester = resolve_requester(&config).context("Failed to set up the conversion service")?;
    let session = Session::spawn(SessionConfig::default(), requester, clipboard());
    let handle = session.handle();

    // ── Select input ─────────────────────────────────────────────────────
    let file = match SelectedFile::load(&cli.input, cli.timeout).await {
        Ok(file) => file,
        Err(ConvertError::NotAPdf { name }) => {
            let err = handle.reject_file(name).await.err();
            return Err(err.unwrap_or(ConvertError::Internal("selection rejected".into())))
                .context("Failed to select input");
        }
        Err(e) => return Err(e).context("Failed to load input"),
    };
    handle.select_file(file).await?;
    handle.select_format(cli.format.into()).await?;

    // ── Convert ──────────────────────────────────────────────────────────
    handle.start_conversion().await.context("Conversion failed")?;
    let bar = show_progress.then(|| spawn_progress_bar(handle.subscribe()));
    let snapshot = handle.wait_until_ready().await?;
    if let Some(bar) = bar {
        bar.await.ok();
    }

    if snapshot.phase == Phase::Failed {
        let message = snapshot.error.clone().unwrap_or_default();
        if cli.json {
            print_json(&snapshot)?;
        }
        return Err(ConvertError::RequestFailed { message }).context("Conversion failed");
    }

    // ── Deliver ──────────────────────────────────────────────────────────
    let snapshot = deliver(&cli, &handle, snapshot).await?;
    if cli.json {
        print_json(&snapshot)?;
    }

    session.shutdown().await;
    Ok(())
}

/// Print, save and/or copy a successful result. Returns the final snapshot.
///
/// A clipboard failure is reported but never loses the result: when it was
/// not printed, saved or about to be emitted as JSON it goes to stdout.
async fn deliver(cli: &Cli, handle: &SessionHandle, snapshot: Snapshot) -> Result<Snapshot> {
    let result = snapshot.result.clone().unwrap_or_default();
    let print = prints_to_stdout(cli);

    if print {
        write_stdout(&result)?;
    }

    if let Some(ref dir) = cli.output_dir {
        let path = handle.download(dir).await.context("Failed to save result")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} chars  →  {}",
                green("✔"),
                result.chars().count(),
                bold(&path.display().to_string())
            );
        }
    }

    if cli.copy {
        match handle.copy_result().await {
            Ok(()) => {
                if !cli.quiet {
                    eprintln!("{}  Copied {} chars to the clipboard", green("✔"), result.chars().count());
                }
            }
            Err(ConvertError::ClipboardFailed { detail }) => {
                let notice = handle
                    .snapshot()
                    .clipboard_error
                    .unwrap_or_else(|| CLIPBOARD_FAILURE_MESSAGE.to_string());
                eprintln!("{} {}  {}", red("✘"), red(&notice), dim(&detail));
                if !print && cli.output_dir.is_none() && !cli.json {
                    write_stdout(&result)?;
                }
            }
            Err(e) => return Err(e).context("Failed to copy result"),
        }
    }

    Ok(handle.snapshot())
}

/// stdout is the default sink unless the result goes somewhere else.
fn prints_to_stdout(cli: &Cli) -> bool {
    cli.print || (cli.output_dir.is_none() && !cli.copy && !cli.json)
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        out.write_all(b"\n").ok();
    }
    Ok(())
}

fn print_json(snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialise snapshot")?;
    println!("{json}");
    Ok(())
}

#[cfg(feature = "clipboard")]
fn clipboard() -> Box<dyn ClipboardSink> {
    Box::new(edgequake_pdfconvert::SystemClipboard)
}

#[cfg(not(feature = "clipboard"))]
fn clipboard() -> Box<dyn ClipboardSink> {
    Box::new(edgequake_pdfconvert::MemoryClipboard::new())
}

/// Mirror the session's simulated progress on an indicatif bar until the
/// loading flag clears.
fn spawn_progress_bar(mut rx: watch::Receiver<Snapshot>) -> JoinHandle<()> {
    let bar = ProgressBar::new(100);
    let style = ProgressStyle::with_template(
        "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("█▉▊▋▌▍▎▏  ")
    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_prefix("Converting");
    bar.enable_steady_tick(Duration::from_millis(80));

    tokio::spawn(async move {
        loop {
            let snap = rx.borrow_and_update().clone();
            bar.set_position(u64::from(snap.progress));
            if let Some(ref name) = snap.file_name {
                bar.set_message(dim(&format!("{name} → {}", snap.format.label())));
            }
            if !snap.loading {
                bar.finish_and_clear();
                match snap.phase {
                    Phase::Succeeded => eprintln!("{} {}", green("✔"), bold("Conversion complete")),
                    Phase::Failed => eprintln!(
                        "{} {}",
                        red("✘"),
                        red(snap.error.as_deref().unwrap_or("Conversion failed"))
                    ),
                    _ => {}
                }
                break;
            }
            if rx.changed().await.is_err() {
                bar.abandon();
                break;
            }
        }
    })
}

/// Map CLI args to `RequesterConfig`.
async fn build_config(cli: &Cli) -> Result<RequesterConfig> {
    let mut builder = RequesterConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .request_timeout_secs(cli.timeout);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["pdfconvert"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn defaults_print_plain_text() {
        let cli = parse(&["invoice.pdf"]);
        assert_eq!(cli.input, "invoice.pdf");
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Text);
        assert_eq!(cli.timeout, 180);
        assert_eq!(cli.max_tokens, 8192);
        assert!(prints_to_stdout(&cli));
    }

    #[test]
    fn output_dir_or_copy_replace_stdout() {
        let cli = parse(&["--format", "markdown", "--output-dir", "out", "report.pdf"]);
        assert_eq!(OutputFormat::from(cli.format), OutputFormat::Markdown);
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(!prints_to_stdout(&cli));

        assert!(!prints_to_stdout(&parse(&["--copy", "a.pdf"])));
        assert!(!prints_to_stdout(&parse(&["--json", "a.pdf"])));
        assert!(prints_to_stdout(&parse(&["--copy", "--print", "a.pdf"])));
    }

    #[test]
    fn format_args_match_format_ids() {
        for arg in FormatArg::value_variants() {
            let name = arg.to_possible_value().expect("visible variant");
            assert_eq!(OutputFormat::from(*arg).id(), name.get_name());
        }
        assert_eq!(FormatArg::value_variants().len(), OutputFormat::ALL.len());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["pdfconvert", "--format", "pptx", "a.pdf"]).is_err());
    }

    struct Fixed;

    impl edgequake_pdfconvert::ConversionRequester for Fixed {
        fn convert<'a>(
            &'a self,
            _format: OutputFormat,
            _file: &'a SelectedFile,
        ) -> futures::future::BoxFuture<'a, Result<String, edgequake_pdfconvert::RequestError>> {
            Box::pin(async { Ok("Total: $42".to_string()) })
        }
    }

    struct NoDisplay;

    impl ClipboardSink for NoDisplay {
        fn set_text(&mut self, _text: &str) -> Result<(), String> {
            Err("no display".to_string())
        }
    }

    #[tokio::test]
    async fn clipboard_failure_keeps_result_for_json() {
        let session = Session::spawn(
            SessionConfig::default(),
            std::sync::Arc::new(Fixed),
            Box::new(NoDisplay),
        );
        let handle = session.handle();
        let file = SelectedFile::from_bytes("invoice.pdf", b"%PDF-1.4\n%%EOF\n".to_vec()).unwrap();
        handle.select_file(file).await.unwrap();
        handle.convert().await.unwrap();

        let cli = parse(&["--copy", "--json", "invoice.pdf"]);
        let snap = deliver(&cli, &handle, handle.snapshot()).await.unwrap();
        assert_eq!(snap.result.as_deref(), Some("Total: $42"));
        assert_eq!(snap.clipboard_error.as_deref(), Some(CLIPBOARD_FAILURE_MESSAGE));
        assert!(!snap.copied);
    }

    #[tokio::test]
    async fn flags_map_onto_requester_config() {
        let cli = parse(&[
            "--endpoint",
            "http://127.0.0.1:9/convert",
            "--model",
            "gpt-4.1-mini",
            "--temperature",
            "0.3",
            "--timeout",
            "30",
            "a.pdf",
        ]);
        let config = build_config(&cli).await.unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://127.0.0.1:9/convert"));
        assert_eq!(config.model.as_deref(), Some("gpt-4.1-mini"));
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.request_timeout_secs, 30);
    }
}
