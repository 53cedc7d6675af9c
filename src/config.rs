use std::path::PathBuf;

use crate::pipeline::coding::ReasoningEffort;

/// Application-level constants
pub const APP_NAME: &str = "medcoder";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model used when neither the caller nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-5";

/// Output budget applied to every request unless the caller overrides it.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 5000;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Provider request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medcoder_lib=info,warn"
}

/// Runtime configuration for coding requests, read from the environment.
///
/// Invalid values fall back to the documented defaults instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingConfig {
    /// `LLM_CODING_MODEL`, then `GPT_MODEL`.
    pub default_model: String,
    /// `GPT5_DEFAULT_REASONING_EFFORT`.
    pub default_reasoning_effort: ReasoningEffort,
    /// `LLM_CODING_MAX_OUTPUT_TOKENS`.
    pub default_max_output_tokens: u64,
    /// `OPENAI_BASE_URL`.
    pub api_base_url: String,
    /// `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// `LLM_CODING_TIMEOUT_SECS`.
    pub timeout_secs: u64,
    /// `MEDCODER_DUMP_DIR`; diagnostics are off when unset.
    pub dump_dir: Option<PathBuf>,
}

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_reasoning_effort: ReasoningEffort::Minimal,
            default_max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dump_dir: None,
        }
    }
}

impl CodingConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup` (env-var name → value).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let default_reasoning_effort = match non_empty("GPT5_DEFAULT_REASONING_EFFORT") {
            Some(raw) => ReasoningEffort::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "Invalid GPT5_DEFAULT_REASONING_EFFORT, using minimal");
                ReasoningEffort::Minimal
            }),
            None => defaults.default_reasoning_effort,
        };

        Self {
            default_model: non_empty("LLM_CODING_MODEL")
                .or_else(|| non_empty("GPT_MODEL"))
                .unwrap_or(defaults.default_model),
            default_reasoning_effort,
            default_max_output_tokens: parse_positive(
                non_empty("LLM_CODING_MAX_OUTPUT_TOKENS"),
                "LLM_CODING_MAX_OUTPUT_TOKENS",
            )
            .unwrap_or(defaults.default_max_output_tokens),
            api_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.api_base_url),
            api_key: non_empty("OPENAI_API_KEY"),
            timeout_secs: parse_positive(
                non_empty("LLM_CODING_TIMEOUT_SECS"),
                "LLM_CODING_TIMEOUT_SECS",
            )
            .unwrap_or(defaults.timeout_secs),
            dump_dir: non_empty("MEDCODER_DUMP_DIR").map(PathBuf::from),
        }
    }
}

fn parse_positive(raw: Option<String>, key: &str) -> Option<u64> {
    let raw = raw?;
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid numeric setting");
            None
        }
    }
}
