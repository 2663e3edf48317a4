//! Vision-LLM conversion requester.
//!
//! The whole document goes out as **one** chat request: a format-specific
//! system prompt, then a user turn carrying every rendered page as an image.
//! One request per attempt keeps the contract of a single external call;
//! the model sees all pages at once, so cross-page tables and running text
//! come back in one coherent payload.

use super::postprocess::clean_output;
use super::render::render_document;
use super::ConversionRequester;
use crate::config::RequesterConfig;
use crate::error::RequestError;
use crate::file::SelectedFile;
use crate::format::OutputFormat;
use crate::prompts::{system_prompt, user_instruction};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Converts PDFs by showing rendered pages to a vision-capable LLM.
pub struct VisionRequester {
    provider: Arc<dyn LLMProvider>,
    config: RequesterConfig,
}

impl VisionRequester {
    pub fn new(provider: Arc<dyn LLMProvider>, config: RequesterConfig) -> Self {
        Self { provider, config }
    }

    async fn run(&self, format: OutputFormat, file: &SelectedFile) -> Result<String, RequestError> {
        let start = Instant::now();

        let images = render_document(file.shared_bytes(), self.config.max_rendered_pixels)
            .await
            .map_err(|e| RequestError::new(e.to_string()))?;
        let page_count = images.len();

        let system = self
            .config
            .system_prompt
            .clone()
            .unwrap_or_else(|| system_prompt(format));
        let messages = vec![
            ChatMessage::system(system),
            ChatMessage::user_with_images(user_instruction(format, file.name(), page_count), images),
        ];
        let options = build_options(&self.config);

        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        let response = tokio::time::timeout(timeout, self.provider.chat(&messages, Some(&options)))
            .await
            .map_err(|_| {
                warn!("VLM call timed out after {}s", timeout.as_secs());
                RequestError::new(format!(
                    "The conversion service did not answer within {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                warn!("VLM call failed: {}", e);
                RequestError::new(e.to_string())
            })?;

        debug!(
            "{} pages: {} input tokens, {} output tokens",
            page_count, response.prompt_tokens, response.completion_tokens
        );

        let text = clean_output(&response.content, format);
        if text.trim().is_empty() {
            return Err(RequestError::new("The conversion service returned an empty document"));
        }

        info!(
            "Converted '{}' to {} in {}ms",
            file.name(),
            format,
            start.elapsed().as_millis()
        );
        Ok(text)
    }
}

/// Build `CompletionOptions` from the requester config.
fn build_options(config: &RequesterConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

impl ConversionRequester for VisionRequester {
    fn convert<'a>(
        &'a self,
        format: OutputFormat,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<String, RequestError>> {
        Box::pin(self.run(format, file))
    }

    fn name(&self) -> &str {
        "vision"
    }
}
