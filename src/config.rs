use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    /// Provider used for extraction and canonicalization
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Candidate ranking and confidence gate
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Shopping list presentation
    #[serde(default)]
    pub shopping: ShoppingConfig,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

/// Configuration for a specific LLM provider
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,
    /// Temperature for generation. Extraction wants determinism, hence 0.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// API key for authentication (can also be set via environment variable)
    pub api_key: Option<String>,
    /// Base URL for API endpoint (for custom or proxy endpoints)
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Candidates sent to the resolver per item (at least 5 are always kept)
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,
    /// Minimum resolver confidence to adopt a catalog entry
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShoppingConfig {
    /// Preferred category order; unknown categories sort alphabetically after
    #[serde(default = "default_category_order")]
    pub category_order: Vec<String>,
}

impl Default for ShoppingConfig {
    fn default() -> Self {
        Self {
            category_order: default_category_order(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_provider: default_provider(),
            providers: HashMap::new(),
            matching: MatchingConfig::default(),
            shopping: ShoppingConfig::default(),
            timeout: default_timeout(),
        }
    }
}

// Default value functions
fn default_provider() -> String {
    "openai".to_string()
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_candidate_count() -> usize {
    6
}

fn default_confidence_threshold() -> f64 {
    0.75
}

fn default_category_order() -> Vec<String> {
    crate::categorize::DEFAULT_CATEGORY_ORDER
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_timeout() -> u64 {
    30
}

impl PlannerConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with MEALBASKET__ prefix
    /// 2. meal-basket.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: MEALBASKET__PROVIDERS__OPENAI__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
pub fn load_config() -> Result<PlannerConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("meal-basket").required(false))
        // Use double underscore for nested: MEALBASKET__MATCHING__CONFIDENCE_THRESHOLD
        .add_source(
            Environment::with_prefix("MEALBASKET")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
