/// Typed application configuration.
///
/// Loaded by `infrastructure::config::ConfigLoader` (figment merge of
/// defaults, project YAML, and `PRODMIND_*` environment variables) and
/// threaded explicitly into constructors — there is no process-wide config
/// singleton.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub debate: DebateConfig,
}

/// External text-generation endpoint (OpenAI-compatible chat completions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Whole-request timeout; persona calls can run long.
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 300,
            max_tokens: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL, e.g. `sqlite:.prodmind/prodmind.db`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: "sqlite:.prodmind/prodmind.db".to_string(), max_connections: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// One of: json, pretty.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Bounded retry for transient oracle failures: fixed inter-attempt delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, retry_delay_ms: 2000 }
    }
}

/// Knobs for the debate engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Mean pairwise similarity at or above which hypotheses count as
    /// converged.
    pub convergence_threshold: f64,
    /// Sliding window: only the last N rounds are rendered into persona
    /// context. 5 keeps everything at the round ceiling.
    pub history_window_rounds: u32,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self { convergence_threshold: 0.7, history_window_rounds: 5 }
    }
}
