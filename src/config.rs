use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use crate::core::{popularity_caps, MatcherSettings};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub search: SearchSettings,
    #[serde(default)]
    pub extractor: ExtractorSettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Upstash Vector index
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub url: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorProvider {
    OpenAi,
    Rules,
}

/// Questionnaire extraction via an OpenAI-compatible endpoint, or local rules
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorSettings {
    pub provider: Option<ExtractorProvider>,
    #[serde(default = "default_openai_base")]
    pub api_base: String,
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            provider: None,
            api_base: default_openai_base(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ExtractorSettings {
    /// Provider to use; OpenAI when a key is present unless set explicitly
    pub fn effective_provider(&self) -> ExtractorProvider {
        match (self.provider, self.api_key.as_deref()) {
            (Some(provider), _) => provider,
            (None, Some(key)) if !key.is_empty() => ExtractorProvider::OpenAi,
            (None, _) => ExtractorProvider::Rules,
        }
    }
}

fn default_openai_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_timeout_secs() -> u64 { 10 }

/// The Dog API
#[derive(Debug, Clone, Deserialize)]
pub struct ImageSettings {
    #[serde(default = "default_images_base")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            base_url: default_images_base(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_images_base() -> String { "https://api.thedogapi.com/v1".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Popularity caps tried in order; "any" is always tried last
    #[serde(default = "default_popularity_caps")]
    pub popularity_caps: Vec<u32>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_quick_top_k")]
    pub quick_top_k: usize,
    #[serde(default = "default_catalog_top_k")]
    pub catalog_top_k: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            popularity_caps: default_popularity_caps(),
            top_k: default_top_k(),
            quick_top_k: default_quick_top_k(),
            catalog_top_k: default_catalog_top_k(),
        }
    }
}

impl From<&MatchingSettings> for MatcherSettings {
    fn from(settings: &MatchingSettings) -> Self {
        Self {
            popularity_caps: popularity_caps(&settings.popularity_caps),
            top_k: settings.top_k.max(1),
            quick_top_k: settings.quick_top_k.max(1),
            catalog_top_k: settings.catalog_top_k.max(1),
        }
    }
}

fn default_popularity_caps() -> Vec<u32> { vec![50, 100, 150] }
fn default_top_k() -> usize { 8 }
fn default_quick_top_k() -> usize { 1 }
fn default_catalog_top_k() -> usize { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_catalog_ttl")]
    pub ttl_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self { ttl_secs: default_catalog_ttl() }
    }
}

fn default_catalog_ttl() -> u64 { 300 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl LoggingSettings {
    /// Apply LOG_LEVEL and LOG_FORMAT on top of the configured values
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT").filter(|v| !v.is_empty()) {
            self.format = format;
        }
        self
    }

    pub fn is_pretty(&self) -> bool {
        self.format.eq_ignore_ascii_case("pretty")
    }
}

/// Well-known environment variables and the settings keys they fill
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("UPSTASH_VECTOR_REST_URL", "search.url"),
    ("UPSTASH_VECTOR_REST_TOKEN", "search.token"),
    ("OPENAI_API_KEY", "extractor.api_key"),
    ("THE_DOG_API_KEY", "images.api_key"),
];

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default, config/local)
    /// 3. Environment variables prefixed with BREED__
    /// 4. Provider variables such as UPSTASH_VECTOR_REST_URL
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., BREED__SERVER__PORT -> server.port
            .add_source(breed_environment())
            .build()?;

        apply_env_overrides(settings, |name| std::env::var(name).ok())?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(breed_environment())
            .build()?;

        apply_env_overrides(settings, |name| std::env::var(name).ok())?.try_deserialize()
    }
}

fn breed_environment() -> Environment {
    Environment::with_prefix("BREED")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("matching.popularity_caps")
        .try_parsing(true)
}

/// Layer provider variables on top of the loaded settings
fn apply_env_overrides<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    for (name, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
            builder = builder.set_override(*key, value)?;
        }
    }

    builder.build()
}
