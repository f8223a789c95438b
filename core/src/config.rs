//! Client configuration and the one-time setup hook.
//!
//! # Design
//! Configuration is an explicit value: build a `Config` once at startup and
//! pass it to `Client::new`. Applications that want the "configure once per
//! process" behavior put a [`Setup`] in a `static` of their own; the library
//! itself keeps no global state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::error::Error;
use crate::logging::CallLogger;

pub const DEFAULT_BASE_URL: &str = "https://api.pipedrive.com";

/// Connect and read timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Pause before the single retry after an unparsable response.
pub const DEFAULT_PARSE_RETRY_DELAY: Duration = Duration::from_secs(5);

pub fn default_user_agent() -> String {
    format!("Pipedrive Rust Client v{}", env!("CARGO_PKG_VERSION"))
}

/// Validated client settings.
#[derive(Clone)]
pub struct Config {
    api_token: String,
    base_url: String,
    debug: bool,
    user_agent: String,
    logger: Option<Arc<dyn CallLogger>>,
    timeout: Duration,
    timeout_retries: Option<u32>,
    parse_retry_delay: Duration,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Read settings from `PIPEDRIVE_API_TOKEN`, `PIPEDRIVE_DEBUG`,
    /// `PIPEDRIVE_USER_AGENT` and `PIPEDRIVE_BASE_URL`.
    pub fn from_env() -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Ok(token) = std::env::var("PIPEDRIVE_API_TOKEN") {
            builder = builder.api_token(token);
        }
        if let Ok(debug) = std::env::var("PIPEDRIVE_DEBUG") {
            builder = builder.debug(matches!(
                debug.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ));
        }
        if let Ok(agent) = std::env::var("PIPEDRIVE_USER_AGENT") {
            builder = builder.user_agent(agent);
        }
        if let Ok(url) = std::env::var("PIPEDRIVE_BASE_URL") {
            builder = builder.base_url(url);
        }
        builder.build()
    }

    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Wire-level logging of request and response bodies.
    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn logger(&self) -> Option<&Arc<dyn CallLogger>> {
        self.logger.as_ref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Maximum consecutive timeout retries; `None` retries without limit.
    pub fn timeout_retries(&self) -> Option<u32> {
        self.timeout_retries
    }

    pub fn parse_retry_delay(&self) -> Duration {
        self.parse_retry_delay
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("debug", &self.debug)
            .field("user_agent", &self.user_agent)
            .field("logger", &self.logger.is_some())
            .field("timeout", &self.timeout)
            .field("timeout_retries", &self.timeout_retries)
            .field("parse_retry_delay", &self.parse_retry_delay)
            .finish()
    }
}

/// Builder for [`Config`]. Unset fields fall back to the library defaults.
#[derive(Clone, Default)]
pub struct ConfigBuilder {
    api_token: Option<String>,
    base_url: Option<String>,
    debug: bool,
    user_agent: Option<String>,
    logger: Option<Arc<dyn CallLogger>>,
    timeout: Option<Duration>,
    timeout_retries: Option<u32>,
    parse_retry_delay: Option<Duration>,
}

impl ConfigBuilder {
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn logger(mut self, logger: Arc<dyn CallLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_retries(mut self, retries: u32) -> Self {
        self.timeout_retries = Some(retries);
        self
    }

    pub fn parse_retry_delay(mut self, delay: Duration) -> Self {
        self.parse_retry_delay = Some(delay);
        self
    }

    /// In-place variants used by [`Setup::setup`] blocks.
    pub fn set_api_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    pub fn set_user_agent(&mut self, agent: impl Into<String>) -> &mut Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn set_logger(&mut self, logger: Arc<dyn CallLogger>) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    pub fn set_base_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn set_timeout_retries(&mut self, retries: u32) -> &mut Self {
        self.timeout_retries = Some(retries);
        self
    }

    pub fn set_parse_retry_delay(&mut self, delay: Duration) -> &mut Self {
        self.parse_retry_delay = Some(delay);
        self
    }

    pub fn build(self) -> Result<Config, Error> {
        let api_token = self
            .api_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingApiToken)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            api_token,
            base_url,
            debug: self.debug,
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            logger: self.logger,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            timeout_retries: self.timeout_retries,
            parse_retry_delay: self.parse_retry_delay.unwrap_or(DEFAULT_PARSE_RETRY_DELAY),
        })
    }
}

/// Applies a configuration block exactly once.
///
/// ```
/// use pipedrive_core::Setup;
///
/// static PIPEDRIVE: Setup = Setup::new();
///
/// PIPEDRIVE.setup(|c| {
///     c.set_api_token("first");
/// });
/// PIPEDRIVE.setup(|c| {
///     c.set_api_token("second");
/// });
/// assert_eq!(PIPEDRIVE.config().unwrap().api_token(), "first");
/// ```
pub struct Setup {
    applied: OnceCell<ConfigBuilder>,
}

impl Setup {
    pub const fn new() -> Self {
        Self {
            applied: OnceCell::new(),
        }
    }

    /// Run `block` if no block has run yet. Returns whether it ran.
    pub fn setup(&self, block: impl FnOnce(&mut ConfigBuilder)) -> bool {
        let mut ran = false;
        self.applied.get_or_init(|| {
            let mut builder = ConfigBuilder::default();
            block(&mut builder);
            ran = true;
            builder
        });
        ran
    }

    pub fn is_applied(&self) -> bool {
        self.applied.get().is_some()
    }

    /// Validate and return the applied configuration.
    ///
    /// Fails with [`Error::MissingApiToken`] if setup has not run or left the
    /// token blank.
    pub fn config(&self) -> Result<Config, Error> {
        self.applied
            .get()
            .cloned()
            .ok_or(Error::MissingApiToken)?
            .build()
    }
}

impl Default for Setup {
    fn default() -> Self {
        Self::new()
    }
}
