//! HTTP conversion requester.
//!
//! Posts the PDF and the target format to a conversion endpoint as JSON:
//!
//! ```json
//! { "format": "markdown", "file_name": "report.pdf",
//!   "media_type": "application/pdf", "content_base64": "JVBERi0x..." }
//! ```
//!
//! A 2xx answer is either JSON carrying the text in `content` (also accepted:
//! `result`, `text`) or the converted text as the raw body. Any other status
//! is a failure whose message is the body's `message` or `error` field; a
//! body without one yields no message and the controller falls back to its
//! generic text. One attempt, no retry. The service's text is returned
//! exactly as sent.

use super::ConversionRequester;
use crate::config::RequesterConfig;
use crate::error::{ConvertError, RequestError};
use crate::file::SelectedFile;
use crate::format::OutputFormat;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Request body sent to the conversion endpoint.
#[derive(Debug, Serialize)]
pub struct WireRequest<'a> {
    pub format: OutputFormat,
    pub file_name: &'a str,
    pub media_type: &'a str,
    pub content_base64: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireResponse {
    content: Option<String>,
    result: Option<String>,
    text: Option<String>,
    message: Option<String>,
    error: Option<serde_json::Value>,
}

/// Converts PDFs by posting them to an HTTP endpoint.
pub struct HttpRequester {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
}

impl HttpRequester {
    pub fn new(endpoint: impl Into<String>, config: &RequesterConfig) -> Result<Self, ConvertError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConvertError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn run(&self, format: OutputFormat, file: &SelectedFile) -> Result<String, RequestError> {
        let body = WireRequest {
            format,
            file_name: file.name(),
            media_type: file.media_type(),
            content_base64: STANDARD.encode(file.bytes()),
        };
        let payload = serde_json::to_vec(&body)
            .map_err(|e| RequestError::new(format!("Could not encode request: {e}")))?;

        info!("POST {} ({} → {})", self.endpoint, file.name(), format);
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json, text/plain")
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                warn!("Conversion request failed: {}", e);
                if e.is_timeout() {
                    RequestError::new(format!(
                        "The conversion service did not answer within {}s",
                        self.timeout_secs
                    ))
                } else {
                    RequestError::new(format!("Could not reach the conversion service: {e}"))
                }
            })?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RequestError::new(format!("Could not read the service response: {e}")))?;
        debug!("HTTP {} with {} bytes (json: {})", status, bytes.len(), is_json);

        if status.is_success() {
            success_text(&bytes, is_json)
        } else {
            let message = failure_message(&bytes);
            warn!("Conversion service answered HTTP {}: {:?}", status, message);
            Err(RequestError { message })
        }
    }
}

impl ConversionRequester for HttpRequester {
    fn convert<'a>(
        &'a self,
        format: OutputFormat,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<String, RequestError>> {
        Box::pin(self.run(format, file))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Extract the converted text from a 2xx body.
fn success_text(body: &[u8], is_json: bool) -> Result<String, RequestError> {
    if is_json {
        let parsed: WireResponse = serde_json::from_slice(body)
            .map_err(|e| RequestError::new(format!("Malformed service response: {e}")))?;
        return parsed
            .content
            .or(parsed.result)
            .or(parsed.text)
            .ok_or_else(|| RequestError::new("The service response contained no converted content"));
    }
    String::from_utf8(body.to_vec())
        .map_err(|_| RequestError::new("The service response is not valid UTF-8 text"))
}

/// Human-readable reason from an error body, if it has one.
fn failure_message(body: &[u8]) -> Option<String> {
    let parsed: WireResponse = serde_json::from_slice(body).ok()?;
    let from_error = parsed.error.and_then(|e| match e {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Object(map) => map
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        _ => None,
    });
    parsed
        .message
        .or(from_error)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn success_text_reads_content_field() {
        let body = br#"{"content": "Total: $42"}"#;
        assert_eq!(success_text(body, true).unwrap(), "Total: $42");
        let body = br#"{"result": "r"}"#;
        assert_eq!(success_text(body, true).unwrap(), "r");
    }

    #[test]
    fn success_text_accepts_raw_body() {
        assert_eq!(success_text(b"a,b\n1,2\n", false).unwrap(), "a,b\n1,2\n");
    }

    #[test]
    fn success_json_without_content_is_an_error() {
        let err = success_text(br#"{"status": "ok"}"#, true).unwrap_err();
        assert!(err.user_message().contains("no converted content"));
    }

    #[test]
    fn failure_message_variants() {
        assert_eq!(
            failure_message(br#"{"message": "Service unavailable"}"#).as_deref(),
            Some("Service unavailable")
        );
        assert_eq!(
            failure_message(br#"{"error": "quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            failure_message(br#"{"error": {"message": "bad pdf"}}"#).as_deref(),
            Some("bad pdf")
        );
        assert_eq!(failure_message(b"<html>502</html>"), None);
        assert_eq!(failure_message(br#"{"message": "  "}"#), None);
    }

    #[test]
    fn wire_request_uses_format_id() {
        let req = WireRequest {
            format: OutputFormat::Markdown,
            file_name: "a.pdf",
            media_type: "application/pdf",
            content_base64: "JVBERg==".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["format"], "markdown");
        assert_eq!(json["file_name"], "a.pdf");
    }

    /// Serve exactly one canned HTTP response on a local port.
    async fn one_shot_server(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 8192];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
                if request_complete(&received) {
                    break;
                }
            }
            let reply = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/convert")
    }

    fn request_complete(data: &[u8]) -> bool {
        let text = String::from_utf8_lossy(data);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..header_end]
            .lines()
            .find_map(|l| {
                let (k, v) = l.split_once(':')?;
                k.eq_ignore_ascii_case("content-length")
                    .then(|| v.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        data.len() >= header_end + 4 + length
    }

    fn pdf() -> SelectedFile {
        SelectedFile::from_bytes("invoice.pdf", b"%PDF-1.4\n%%EOF\n".to_vec()).unwrap()
    }

    #[tokio::test]
    async fn round_trip_success() {
        let url = one_shot_server("200 OK", "application/json", r#"{"content":"Total: $42"}"#).await;
        let r = HttpRequester::new(url, &RequesterConfig::default()).unwrap();
        let text = r.convert(OutputFormat::Text, &pdf()).await.unwrap();
        assert_eq!(text, "Total: $42");
    }

    #[tokio::test]
    async fn round_trip_keeps_body_verbatim() {
        let url = one_shot_server("200 OK", "text/csv", "```\nname,qty\nwidget,2\n```").await;
        let r = HttpRequester::new(url, &RequesterConfig::default()).unwrap();
        let text = r.convert(OutputFormat::Csv, &pdf()).await.unwrap();
        assert_eq!(text, "```\nname,qty\nwidget,2\n```");
    }

    #[tokio::test]
    async fn round_trip_failure_surfaces_message() {
        let url = one_shot_server(
            "503 Service Unavailable",
            "application/json",
            r#"{"message":"Service unavailable"}"#,
        )
        .await;
        let r = HttpRequester::new(url, &RequesterConfig::default()).unwrap();
        let err = r.convert(OutputFormat::Json, &pdf()).await.unwrap_err();
        assert_eq!(err.message.as_deref(), Some("Service unavailable"));
    }

    #[tokio::test]
    async fn round_trip_failure_without_message() {
        let url = one_shot_server("500 Internal Server Error", "text/html", "<h1>oops</h1>").await;
        let r = HttpRequester::new(url, &RequesterConfig::default()).unwrap();
        let err = r.convert(OutputFormat::Json, &pdf()).await.unwrap_err();
        assert_eq!(err.message, None);
        assert_eq!(err.user_message(), crate::error::FALLBACK_REQUEST_MESSAGE);
    }
}
