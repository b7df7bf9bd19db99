//! Runtime configuration
//!
//! Read from the process environment after `.env` has been loaded.

use crate::error::AssistantError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Selects the Gemini-backed generator instead of the offline mock.
    pub use_real_llm: bool,
    /// Only read by the real generator.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub llm_timeout: Duration,
    pub port: u16,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            use_real_llm: false,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            port: DEFAULT_PORT,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let use_real_llm = lookup("USE_REAL_LLM")
            .map(|v| parse_flag(&v))
            .unwrap_or(defaults.use_real_llm);

        let gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != "your_gemini_api_key_here");

        let gemini_model = lookup("GEMINI_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.gemini_model);

        let llm_timeout = match lookup("LLM_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                AssistantError::Config(format!("LLM_TIMEOUT_SECS is not a number: {}", raw))
            })?),
            None => defaults.llm_timeout,
        };

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| AssistantError::Config(format!("invalid port: {}", raw)))?,
            None => defaults.port,
        };

        Ok(Self {
            use_real_llm,
            gemini_api_key,
            gemini_model,
            llm_timeout,
            port,
        })
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
