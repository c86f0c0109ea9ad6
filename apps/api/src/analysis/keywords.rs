//! Keyword Extractor: turns normalized text into deduplicated keyword sets.
//!
//! Resume side is always deterministic. Job-description side may first ask the
//! external text generator to surface key skills, and falls back to
//! deterministic tokenization on any failure, timeout, or unparseable reply.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::normalizer::{NormalizedText, Normalizer};
use crate::analysis::prompts::JOB_KEYWORDS_PROMPT_TEMPLATE;
use crate::llm_client::{generate_within, strip_json_fences, TextGenerator};

// ────────────────────────────────────────────────────────────────────────────
// KeywordSet
// ────────────────────────────────────────────────────────────────────────────

/// Unordered, deduplicated normalized tokens. Serializes as a sorted array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordSet(BTreeSet<String>);

impl KeywordSet {
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.0.contains(keyword)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn intersection(&self, other: &KeywordSet) -> KeywordSet {
        self.0.intersection(&other.0).cloned().collect()
    }

    pub fn difference(&self, other: &KeywordSet) -> KeywordSet {
        self.0.difference(&other.0).cloned().collect()
    }

    /// Comma-joined, sorted. Used when rendering sets into prompts.
    pub fn joined(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
    }
}

impl FromIterator<String> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<String> for KeywordSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Base mode: the whitespace-split token set of normalized text.
pub fn extract_keywords(normalized: &NormalizedText) -> KeywordSet {
    normalized.tokens().map(str::to_string).collect()
}

// ────────────────────────────────────────────────────────────────────────────
// External reply parsing
// ────────────────────────────────────────────────────────────────────────────

/// Keywords surfaced by the external generator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedKeywords {
    pub keywords: Vec<String>,
}

/// Typed view of an untrusted generator reply.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordResponse {
    Parsed(ParsedKeywords),
    ParseFailure(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordPayload {
    Object(ParsedKeywords),
    List(Vec<String>),
}

/// Parses `{"keywords": [...]}` or a bare string array, optionally fenced or
/// embedded in surrounding prose.
pub fn parse_keyword_response(raw: &str) -> KeywordResponse {
    let text = strip_json_fences(raw);

    for candidate in [Some(text), embedded_json(text)].into_iter().flatten() {
        if let Ok(payload) = serde_json::from_str::<KeywordPayload>(candidate) {
            let keywords = match payload {
                KeywordPayload::Object(parsed) => parsed.keywords,
                KeywordPayload::List(list) => list,
            };
            let keywords = keywords
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            return KeywordResponse::Parsed(ParsedKeywords { keywords });
        }
    }

    KeywordResponse::ParseFailure(raw.to_string())
}

fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (end > start).then(|| &text[start..=end])
}

// ────────────────────────────────────────────────────────────────────────────
// Job-description extraction
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordSource {
    Llm,
    Deterministic,
}

#[derive(Debug, Clone)]
pub struct JobKeywords {
    pub keywords: KeywordSet,
    pub source: KeywordSource,
    /// Set when the external path was attempted and abandoned.
    pub fallback_reason: Option<String>,
}

/// Augmented mode. The RAW job text goes to the generator; its reply is
/// normalized like any other input. Every failure falls back to base mode.
pub async fn extract_job_keywords(
    raw_job: &str,
    normalizer: &Normalizer,
    generator: Option<&dyn TextGenerator>,
    timeout: Duration,
) -> JobKeywords {
    let deterministic = |reason: Option<String>| JobKeywords {
        keywords: extract_keywords(&normalizer.normalize(raw_job)),
        source: KeywordSource::Deterministic,
        fallback_reason: reason,
    };

    let Some(generator) = generator else {
        return deterministic(None);
    };
    if raw_job.trim().is_empty() {
        return deterministic(None);
    }

    let prompt = JOB_KEYWORDS_PROMPT_TEMPLATE.replace("{jd_text}", raw_job);
    let reply = match generate_within(generator, &prompt, timeout).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Job keyword extraction failed, using deterministic tokens: {e}");
            return deterministic(Some(format!("keyword extraction service failed: {e}")));
        }
    };

    match parse_keyword_response(&reply) {
        KeywordResponse::Parsed(parsed) => {
            let keywords = extract_keywords(&normalizer.normalize(&parsed.keywords.join(" ")));
            if keywords.is_empty() {
                warn!("Job keyword extraction returned no usable keywords");
                return deterministic(Some(
                    "keyword extraction service returned no usable keywords".to_string(),
                ));
            }
            debug!("Job keywords from generator: {}", keywords.len());
            JobKeywords {
                keywords,
                source: KeywordSource::Llm,
                fallback_reason: None,
            }
        }
        KeywordResponse::ParseFailure(raw) => {
            let preview: String = raw.chars().take(80).collect();
            warn!("Unparseable keyword reply, using deterministic tokens: {preview:?}");
            deterministic(Some(
                "keyword extraction service returned an unparseable reply".to_string(),
            ))
        }
    }
}
