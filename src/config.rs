//! Runtime settings loaded from an optional YAML file.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Command-line flags are applied on top by `main`.
//!
//! ```yaml
//! timeout_secs: 10
//! deadline_secs: 60
//! max_per_platform: 10
//! endpoints:
//!   bing:
//!     search: "https://cn.bing.com/news/search?q={keyword}"
//! ```

use crate::error::ConfigError;
use crate::models::PlatformId;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Placeholder substituted with the percent-encoded keyword in endpoint templates.
pub const KEYWORD_PLACEHOLDER: &str = "{keyword}";

/// Replacement endpoint templates for one platform.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EndpointOverride {
    /// Search page template, e.g. `https://www.bing.com/news/search?q={keyword}`.
    pub search: Option<String>,
    /// Fallback API template.
    pub api: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Deadline for the whole run; platforms still pending are recorded as timed out.
    pub deadline_secs: u64,
    /// Maximum results kept per platform after deduplication.
    pub max_per_platform: usize,
    /// How many platforms are searched at the same time.
    pub max_concurrency: usize,
    /// Base delay before the single retry of a transient failure.
    pub retry_delay_ms: u64,
    pub user_agent: String,
    pub accept_language: String,
    pub endpoints: HashMap<PlatformId, EndpointOverride>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            deadline_secs: 60,
            max_per_platform: 10,
            max_concurrency: PlatformId::ALL.len(),
            retry_delay_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: DEFAULT_ACCEPT_LANGUAGE.to_string(),
            endpoints: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, does not parse, or
    /// an endpoint template lacks the `{keyword}` placeholder.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let settings = Self::from_yaml(&raw).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: display.clone(),
                source,
            },
            other => other,
        })?;
        info!(endpoint_overrides = settings.endpoints.len(), "Loaded settings");
        Ok(settings)
    }

    /// Parse settings from YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to a struct.
        let settings: Settings = if raw.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (platform, endpoint) in &self.endpoints {
            // The API template may legitimately be fixed, but the search page never is.
            if let Some(search) = &endpoint.search {
                if !search.contains(KEYWORD_PLACEHOLDER) {
                    return Err(ConfigError::Template {
                        platform: *platform,
                        template: search.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs.max(1))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn endpoint(&self, platform: PlatformId) -> Option<&EndpointOverride> {
        self.endpoints.get(&platform)
    }
}
