use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::analysis::formatting::FormattingStrategy;
use crate::analysis::normalizer::NormalizationStrategy;

/// Application configuration loaded from environment variables.
/// Every variable is optional; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// No key means no text generator: analysis runs fully deterministic.
    pub anthropic_api_key: Option<String>,
    pub keyword_strategy: NormalizationStrategy,
    pub formatting_strategy: FormattingStrategy,
    pub llm_timeout: Duration,
    pub keyword_summaries: bool,
    pub stemmer_language: String,
    pub stopwords_path: Option<PathBuf>,
    pub technology_mapping_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            port: non_empty("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: non_empty("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            keyword_strategy: non_empty("KEYWORD_STRATEGY")
                .map(|v| v.parse::<NormalizationStrategy>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("KEYWORD_STRATEGY is invalid")?
                .unwrap_or_default(),
            formatting_strategy: non_empty("FORMATTING_STRATEGY")
                .map(|v| v.parse::<FormattingStrategy>())
                .transpose()
                .map_err(anyhow::Error::msg)
                .context("FORMATTING_STRATEGY is invalid")?
                .unwrap_or_default(),
            llm_timeout: Duration::from_secs(
                non_empty("LLM_TIMEOUT_SECS")
                    .unwrap_or_else(|| "30".to_string())
                    .parse::<u64>()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            keyword_summaries: parse_flag(non_empty("KEYWORD_SUMMARIES").as_deref())
                .context("KEYWORD_SUMMARIES must be true or false")?,
            stemmer_language: non_empty("STEMMER_LANGUAGE")
                .unwrap_or_else(|| "english".to_string()),
            stopwords_path: non_empty("STOPWORDS_PATH").map(PathBuf::from),
            technology_mapping_path: non_empty("TECHNOLOGY_MAPPING_PATH").map(PathBuf::from),
        })
    }
}

fn parse_flag(value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => anyhow::bail!("unrecognized flag value '{other}'"),
        },
    }
}
