use crate::llm::types::WireFormat;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Provider tried first for every query
    #[serde(default = "default_preferred_provider")]
    pub preferred_provider: String,

    /// Probe each candidate before sending it a generation request
    #[serde(default = "default_true")]
    pub probe_before_attempt: bool,

    /// Write debug logs to a file
    #[serde(default)]
    pub debug: bool,

    /// Directory for debug log files (default: next to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_log_dir: Option<String>,

    #[serde(default)]
    pub debug_log_rotation: DebugLogRotation,

    /// Rotated debug log files to keep
    #[serde(default = "default_debug_log_keep")]
    pub debug_log_keep: usize,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub search_log: SearchLogSettings,

    /// LLM backends, in failover order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preferred_provider: default_preferred_provider(),
            probe_before_attempt: true,
            retry: RetrySettings::default(),
            search: SearchSettings::default(),
            search_log: SearchLogSettings::default(),
            debug: false,
            debug_log_dir: None,
            debug_log_rotation: DebugLogRotation::default(),
            debug_log_keep: default_debug_log_keep(),
            providers: default_providers(),
        }
    }
}

/// One LLM backend as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Unique identifier ("local", "groq", ...)
    pub name: String,

    /// Base URL for generation and probe calls
    pub base_url: String,

    /// Wire protocol spoken by the backend
    pub wire_format: WireFormat,

    /// Model identifier
    pub model: String,

    /// Per-attempt timeout for generation requests
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Timeout for the availability probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Whether the backend needs an API key to be usable
    #[serde(default)]
    pub requires_auth: bool,

    /// Inline API key (takes precedence over `api_key_env`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderSettings {
    /// Resolve the API key: inline value first, then the named env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Some(key.to_string());
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Retry policy applied within a single provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Search-fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,
    /// Result language: "en" or "ar"
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            api_key_env: default_search_key_env(),
            language: default_language(),
            num_results: default_num_results(),
            timeout_ms: default_search_timeout_ms(),
        }
    }
}

/// Query log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory holding the log; defaults to `<data_dir>/seeker/logs`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Rotate once the active file reaches this size
    #[serde(default = "default_max_log_bytes")]
    pub max_bytes: u64,
}

impl Default for SearchLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_bytes: default_max_log_bytes(),
        }
    }
}

/// How often the debug log file rolls over
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebugLogRotation {
    Never,
    Hourly,
    #[default]
    Daily,
}

fn default_providers() -> Vec<ProviderSettings> {
    vec![
        ProviderSettings {
            name: "local".to_string(),
            base_url: "http://localhost:11434".to_string(),
            wire_format: WireFormat::Generate,
            model: "mistral:latest".to_string(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            requires_auth: false,
            api_key: None,
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        },
        ProviderSettings {
            name: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            wire_format: WireFormat::ChatCompletions,
            model: "mixtral-8x7b-32768".to_string(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            requires_auth: true,
            api_key: None,
            api_key_env: Some("GROQ_API_KEY".to_string()),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        },
        ProviderSettings {
            name: "xai".to_string(),
            base_url: "https://api.x.ai/v1".to_string(),
            wire_format: WireFormat::ChatCompletions,
            model: "grok-beta".to_string(),
            timeout_ms: default_timeout_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            requires_auth: true,
            api_key: None,
            api_key_env: Some("XAI_API_KEY".to_string()),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        },
    ]
}

fn default_debug_log_keep() -> usize {
    7
}

fn default_preferred_provider() -> String {
    "local".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_search_key_env() -> String {
    "SERPER_API_KEY".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_num_results() -> usize {
    10
}

fn default_search_timeout_ms() -> u64 {
    10_000
}

fn default_max_log_bytes() -> u64 {
    10 * 1024 * 1024
}
