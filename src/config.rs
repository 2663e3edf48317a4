//! Configuration for the interaction session and the conversion requester.
//!
//! Two structs, two concerns:
//!
//! * [`SessionConfig`]: the timing constants of the interaction controller
//!   (progress ticker, settle delay, copy acknowledgement). The defaults are
//!   the values users see; tests shrink or keep them under paused time.
//! * [`RequesterConfig`]: which external service converts the PDF and how
//!   it is called.
//!
//! Both are built through a builder so callers set only what they care
//! about and `build()` rejects nonsensical combinations.

use crate::error::ConvertError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ── Session timing ───────────────────────────────────────────────────────

/// Timing of the simulated progress indicator and transient UI states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Interval between simulated progress ticks. Default: 200 ms.
    pub tick_interval: Duration,

    /// Percentage points added per tick. Default: 5.
    pub tick_increment: u8,

    /// Highest value the simulated progress may reach before the request
    /// resolves. Default: 95.
    pub progress_ceiling: u8,

    /// Pause after success or failure before the loading flag clears.
    /// Default: 500 ms.
    pub settle_delay: Duration,

    /// How long the "copied" acknowledgement stays visible. Default: 2000 ms.
    pub copied_ack: Duration,

    /// Capacity of the command channel between handles and the session task.
    /// Default: 32.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            tick_increment: 5,
            progress_ceiling: 95,
            settle_delay: Duration::from_millis(500),
            copied_ack: Duration::from_millis(2000),
            command_buffer: 32,
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SessionConfig`].
#[derive(Debug)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_interval = interval;
        self
    }

    pub fn tick_increment(mut self, pct: u8) -> Self {
        self.config.tick_increment = pct;
        self
    }

    pub fn progress_ceiling(mut self, pct: u8) -> Self {
        self.config.progress_ceiling = pct;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.settle_delay = delay;
        self
    }

    pub fn copied_ack(mut self, duration: Duration) -> Self {
        self.config.copied_ack = duration;
        self
    }

    pub fn command_buffer(mut self, n: usize) -> Self {
        self.config.command_buffer = n.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SessionConfig, ConvertError> {
        let c = &self.config;
        if c.tick_interval.is_zero() {
            return Err(ConvertError::InvalidConfig(
                "Tick interval must be greater than zero".into(),
            ));
        }
        if c.progress_ceiling >= 100 {
            return Err(ConvertError::InvalidConfig(format!(
                "Progress ceiling must be below 100, got {}",
                c.progress_ceiling
            )));
        }
        if c.tick_increment == 0 {
            return Err(ConvertError::InvalidConfig(
                "Tick increment must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Requester ────────────────────────────────────────────────────────────

/// Configuration of the external conversion call.
///
/// # Example
/// ```rust
/// use edgequake_pdfconvert::RequesterConfig;
///
/// let config = RequesterConfig::builder()
///     .model("gpt-4.1-mini")
///     .temperature(0.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_deref(), Some("gpt-4.1-mini"));
/// ```
#[derive(Clone)]
pub struct RequesterConfig {
    /// HTTP endpoint of a conversion service. When set (and no pre-built
    /// provider is given) the HTTP requester is used instead of a VLM.
    pub endpoint: Option<String>,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, "gpt-4.1-nano".
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate for one document. Default: 8192.
    pub max_tokens: usize,

    /// Timeout of the single conversion request in seconds. Default: 180.
    pub request_timeout_secs: u64,

    /// Longest edge of a rendered page image in pixels. Default: 1600.
    pub max_rendered_pixels: u32,

    /// Custom system prompt replacing the per-format default.
    pub system_prompt: Option<String>,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 8192,
            request_timeout_secs: 180,
            max_rendered_pixels: 1600,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for RequesterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequesterConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .finish()
    }
}

impl RequesterConfig {
    pub fn builder() -> RequesterConfigBuilder {
        RequesterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RequesterConfig`].
#[derive(Debug)]
pub struct RequesterConfigBuilder {
    config: RequesterConfig,
}

impl RequesterConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RequesterConfig, ConvertError> {
        let c = &self.config;
        if let Some(ref url) = c.endpoint {
            if !crate::file::is_url(url) {
                return Err(ConvertError::InvalidConfig(format!(
                    "Endpoint must be an HTTP/HTTPS URL, got '{url}'"
                )));
            }
        }
        if c.request_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(ConvertError::InvalidConfig("Max tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.tick_interval, Duration::from_millis(200));
        assert_eq!(c.tick_increment, 5);
        assert_eq!(c.progress_ceiling, 95);
        assert_eq!(c.settle_delay, Duration::from_millis(500));
        assert_eq!(c.copied_ack, Duration::from_millis(2000));
    }

    #[test]
    fn session_rejects_ceiling_of_100() {
        let err = SessionConfig::builder().progress_ceiling(100).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn session_rejects_zero_interval() {
        assert!(SessionConfig::builder()
            .tick_interval(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn requester_clamps_temperature() {
        let c = RequesterConfig::builder().temperature(9.0).build().unwrap();
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn requester_rejects_non_http_endpoint() {
        let err = RequesterConfig::builder()
            .endpoint("ftp://example.com/convert")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("ftp://"));
    }

    #[test]
    fn requester_debug_hides_provider() {
        let c = RequesterConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("RequesterConfig"));
        assert!(dbg.contains("provider: None"));
    }
}
