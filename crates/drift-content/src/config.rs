//! Loader configuration
//!
//! Every section has defaults matching the live site, so an empty TOML file
//! is a valid configuration.

use crate::binder::TriggerManifest;
use crate::transition::{PhaseTimings, RevealPolicy};
use drift_dom::ContentId;
use drift_net::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fragment shown when a page's HTML cannot be fetched
pub const FALLBACK_HTML: &str = "<div class=\"main__content\"><h1>content missing</h1>\
<p>if you know how to contact me - do so. this is unacceptable !</p>\
<p>once you've done that, go look somewhere else</p></div>";

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Lifecycle manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Page loaded on start and on an empty history state
    pub home: ContentId,
    pub store: StoreConfig,
    /// Markup shown when a page is missing
    pub fallback_html: String,
    pub backdrop: BackdropConfig,
    pub timings: TimingConfig,
    pub reveal: RevealConfig,
    pub classes: ClassNames,
    pub retry: RetryConfig,
    pub preload: PreloadConfig,
    pub search: SearchConfig,
    pub triggers: TriggerManifest,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            home: ContentId::home(),
            store: StoreConfig::default(),
            fallback_html: FALLBACK_HTML.to_string(),
            backdrop: BackdropConfig::default(),
            timings: TimingConfig::default(),
            reveal: RevealConfig::default(),
            classes: ClassNames::default(),
            retry: RetryConfig::default(),
            preload: PreloadConfig::default(),
            search: SearchConfig::default(),
            triggers: TriggerManifest::default(),
        }
    }
}

impl LoaderConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: LoaderConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "Loaded loader config");
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("store.base_url must not be empty".into()));
        }
        if self.fallback_html.trim().is_empty() {
            return Err(ConfigError::Invalid("fallback_html must not be empty".into()));
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid("retry.attempts must be at least 1".into()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        if self.reveal.min_step_ms > self.reveal.max_step_ms {
            return Err(ConfigError::Invalid(
                "reveal.min_step_ms must not exceed reveal.max_step_ms".into(),
            ));
        }
        for (name, value) in [
            ("classes.fade_out", &self.classes.fade_out),
            ("classes.fade_in", &self.classes.fade_in),
            ("classes.animated", &self.classes.animated),
            ("search.error_class", &self.search.error_class),
        ] {
            if value.trim().is_empty() || value.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!("{name} must be a single class name")));
            }
        }
        if let Some(allowed) = &self.triggers.allow {
            if !allowed.contains(&self.home) {
                return Err(ConfigError::Invalid(format!(
                    "home page '{}' is not in triggers.allow",
                    self.home
                )));
            }
        }
        Ok(())
    }

    pub fn timings(&self) -> PhaseTimings {
        PhaseTimings {
            fade_out: Duration::from_millis(self.timings.fade_out_ms),
            fade_in: Duration::from_millis(self.timings.fade_in_ms),
            error_flash: Duration::from_millis(self.backdrop.error_flash_ms),
            search_error: Duration::from_millis(self.search.error_ms),
        }
    }

    pub fn reveal_policy(&self) -> RevealPolicy {
        RevealPolicy {
            budget: Duration::from_millis(self.reveal.budget_ms),
            min_step: Duration::from_millis(self.reveal.min_step_ms),
            max_step: Duration::from_millis(self.reveal.max_step_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry.attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }
}

/// Fragment store layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub base_url: String,
    pub content_dir: String,
    pub script_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".into(),
            content_dir: "content".into(),
            script_dir: "content/js".into(),
        }
    }
}

/// Background element settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropConfig {
    /// Used when no stylesheet sets `--base-bg-color`
    pub default_color: String,
    pub error_color: String,
    pub error_flash_ms: u64,
    /// Background layers inserted on start
    pub effects: Vec<String>,
}

impl Default for BackdropConfig {
    fn default() -> Self {
        Self {
            default_color: "#171935".into(),
            error_color: "#5c1a1a".into(),
            error_flash_ms: 400,
            effects: vec!["flat-bg".into(), "marine-snow".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub fade_out_ms: u64,
    pub fade_in_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fade_out_ms: 300,
            fade_in_ms: 450,
        }
    }
}

/// Staggered reveal of new content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// Total time over which elements start revealing
    pub budget_ms: u64,
    pub min_step_ms: u64,
    pub max_step_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            budget_ms: 600,
            min_step_ms: 20,
            max_step_ms: 80,
        }
    }
}

/// Class names the engine toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassNames {
    pub fade_out: String,
    pub fade_in: String,
    /// Added to the page's main content element after a swap
    pub animated: String,
    pub main_content: String,
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            fade_out: "content-fade-out".into(),
            fade_in: "content-fade-in".into(),
            animated: "content-animated".into(),
            main_content: "main__content".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            attempts: policy.attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Warm a page's resources when its trigger is hovered
    pub on_hover: bool,
    /// Warm every bound page on start
    pub links_on_start: bool,
    /// Seed the home page from the markup already on the surface
    pub seed_home: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            on_hover: true,
            links_on_start: false,
            seed_home: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Class identifying the search input in the shell
    pub input_class: String,
    pub error_class: String,
    pub error_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            input_class: "search-input".into(),
            error_class: "search-input--error".into(),
            error_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_site() {
        let config = LoaderConfig::default();
        assert_eq!(config.home.as_str(), "home");
        assert_eq!(config.timings().fade_out, Duration::from_millis(300));
        assert_eq!(config.timings().fade_in, Duration::from_millis(450));
        assert_eq!(config.backdrop.default_color, "#171935");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = LoaderConfig::from_toml("").unwrap();
        assert_eq!(config.classes.fade_out, "content-fade-out");
        assert_eq!(config.triggers.rules.len(), TriggerManifest::default().rules.len());
    }

    #[test]
    fn test_partial_override() {
        let config = LoaderConfig::from_toml(
            r#"
            home = "Welcome"

            [timings]
            fade_out_ms = 100

            [store]
            base_url = "https://hsrp.cc/"
            "#,
        )
        .unwrap();

        assert_eq!(config.home.as_str(), "welcome");
        assert_eq!(config.timings.fade_out_ms, 100);
        assert_eq!(config.timings.fade_in_ms, 450);
        assert_eq!(config.store.content_dir, "content");
    }

    #[test]
    fn test_validation_errors() {
        let err = LoaderConfig::from_toml("[retry]\nattempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = LoaderConfig::from_toml("[classes]\nfade_out = \"two words\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = LoaderConfig::from_toml("home = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_home_must_be_allowed() {
        let err = LoaderConfig::from_toml("[triggers]\nallow = [\"projects\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
