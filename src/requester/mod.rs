//! The conversion requester: one call to an external service per attempt.
//!
//! ```text
//!   SelectedFile + OutputFormat ──▶ ConversionRequester::convert ──▶ text
//!                                         │
//!                     ┌───────────────────┴──────────────────┐
//!                     ▼                                      ▼
//!             VisionRequester                          HttpRequester
//!   (pdfium render → VLM chat, edgequake-llm)   (JSON POST to an endpoint)
//! ```
//!
//! The trait returns a boxed future so sessions can hold an
//! `Arc<dyn ConversionRequester>` and swap implementations (or a scripted
//! test double) without generics leaking into the session type.

pub mod http;
pub mod postprocess;
pub mod render;
pub mod vision;

use crate::config::RequesterConfig;
use crate::error::{ConvertError, RequestError};
use crate::file::SelectedFile;
use crate::format::OutputFormat;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::info;

pub use http::HttpRequester;
pub use vision::VisionRequester;

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Issues the external conversion call.
///
/// Implementations make exactly one attempt: no retry, no streaming. A
/// failure carries the service's message when there is one; the controller
/// substitutes a generic message otherwise.
pub trait ConversionRequester: Send + Sync {
    /// Convert `file` into `format`, resolving with the whole payload as text.
    fn convert<'a>(
        &'a self,
        format: OutputFormat,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<String, RequestError>>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "requester"
    }
}

impl<T: ConversionRequester + ?Sized> ConversionRequester for Arc<T> {
    fn convert<'a>(
        &'a self,
        format: OutputFormat,
        file: &'a SelectedFile,
    ) -> BoxFuture<'a, Result<String, RequestError>> {
        (**self).convert(format, file)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build the requester described by `config`, from most to least specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Endpoint** (`config.endpoint`): an [`HttpRequester`] posting to it.
/// 3. **Named provider** (`config.provider_name`) with `config.model` or
///    [`DEFAULT_MODEL`].
/// 4. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 5. **OpenAI key**: `OPENAI_API_KEY` present selects OpenAI.
/// 6. **Auto-detection** through `ProviderFactory::from_env`.
pub fn resolve_requester(config: &RequesterConfig) -> Result<Arc<dyn ConversionRequester>, ConvertError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::new(VisionRequester::new(Arc::clone(provider), config.clone())));
    }

    if let Some(ref endpoint) = config.endpoint {
        info!("Using HTTP conversion endpoint {}", endpoint);
        return Ok(Arc::new(HttpRequester::new(endpoint.clone(), config)?));
    }

    let provider = resolve_provider(config)?;
    Ok(Arc::new(VisionRequester::new(provider, config.clone())))
}

fn resolve_provider(config: &RequesterConfig) -> Result<Arc<dyn LLMProvider>, ConvertError> {
    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ConvertError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No conversion service could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --endpoint.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ConvertError> {
    info!("Using LLM provider {} / {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ConvertError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
