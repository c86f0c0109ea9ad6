//! Match Engine: orchestrates normalization, keyword extraction, technology
//! expansion and formatting into a single `ScoreReport`.
//!
//! # Scoring
//! ```text
//! expanded   = expand(job_keywords)
//! matched    = expanded ∩ resume_keywords
//! missing    = expanded − matched
//! match      = 100 × |matched| / |expanded|   (0 when expanded is empty)
//! final      = clamp(0.70 × match + 0.30 × formatting, 0, 100)
//! ```
//!
//! Every external text-generation call is optional, bounded by a timeout, and
//! recovers to a deterministic result. Only unusable inputs surface as errors.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::formatting::{score_formatting, FormattingRuleSet, FormattingStrategy};
use crate::analysis::keywords::{extract_job_keywords, extract_keywords, KeywordSet, KeywordSource};
use crate::analysis::normalizer::{NormalizationStrategy, Normalizer};
use crate::analysis::prompts::{MATCHED_SUMMARY_PROMPT_TEMPLATE, MISSING_SUMMARY_PROMPT_TEMPLATE};
use crate::analysis::technology::TechnologyMapping;
use crate::llm_client::{generate_within, TextGenerator};

pub const MATCH_WEIGHT: f64 = 0.70;
pub const FORMATTING_WEIGHT: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Resume,
    JobDescription,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Resume => write!(f, "resume"),
            InputKind::JobDescription => write!(f, "job description"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("{0} text is empty or missing")]
    InputUnavailable(InputKind),

    #[error("invalid formatting rules: {0}")]
    InvalidRules(String),
}

/// Engine-wide knobs fixed at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub formatting_strategy: FormattingStrategy,
    pub llm_timeout: Duration,
    pub keyword_summaries: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            formatting_strategy: FormattingStrategy::Headers,
            llm_timeout: Duration::from_secs(30),
            keyword_summaries: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationInfo {
    pub strategy: NormalizationStrategy,
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub match_score: f64,
    pub matched_keywords: KeywordSet,
    pub missing_keywords: KeywordSet,
    pub formatting_score: f64,
    pub formatting_reasons: Vec<String>,
    pub final_score: f64,

    pub heading_score: f64,
    pub star_score: Option<f64>,
    pub rule_scores: BTreeMap<String, f64>,
    pub formatting_strategy: FormattingStrategy,

    pub resume_keywords: KeywordSet,
    /// Extracted job keywords before technology expansion.
    pub job_keywords: KeywordSet,
    pub expanded_job_keywords: KeywordSet,
    pub job_keyword_source: KeywordSource,
    pub normalization: NormalizationInfo,

    pub matched_summary: Option<String>,
    pub missing_summary: Option<String>,
    /// One line per degradation taken while producing this report.
    pub notes: Vec<String>,
}

/// `100 × |resume ∩ job| / |job|`, or 0 for an empty job set.
pub fn compute_match_score(resume: &KeywordSet, job: &KeywordSet) -> f64 {
    if job.is_empty() {
        return 0.0;
    }
    let matched = job.intersection(resume).len();
    100.0 * matched as f64 / job.len() as f64
}

pub fn compute_final_score(match_score: f64, formatting_score: f64) -> f64 {
    (MATCH_WEIGHT * match_score + FORMATTING_WEIGHT * formatting_score).clamp(0.0, 100.0)
}

pub struct MatchEngine {
    normalizer: Normalizer,
    /// Already in the normalizer's token space.
    technology: TechnologyMapping,
    generator: Option<Arc<dyn TextGenerator>>,
    settings: EngineSettings,
}

impl MatchEngine {
    /// Normalizes `technology` once with `normalizer`, so expanded job keywords
    /// live in the same token space as resume keywords.
    pub fn new(
        normalizer: Normalizer,
        technology: &TechnologyMapping,
        generator: Option<Arc<dyn TextGenerator>>,
        settings: EngineSettings,
    ) -> Self {
        let technology = technology.normalized_with(&normalizer);
        debug!(
            "Technology mapping normalized ({}): {} topics",
            normalizer.strategy(),
            technology.len()
        );
        Self {
            normalizer,
            technology,
            generator,
            settings,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn analyze(
        &self,
        resume_text: &str,
        job_text: &str,
        rules: &FormattingRuleSet,
    ) -> Result<ScoreReport, AnalysisError> {
        if resume_text.trim().is_empty() {
            return Err(AnalysisError::InputUnavailable(InputKind::Resume));
        }
        rules.validate().map_err(AnalysisError::InvalidRules)?;

        let generator = self.generator.as_deref();
        let timeout = self.settings.llm_timeout;
        let mut notes = Vec::new();

        if self.normalizer.is_degraded() {
            notes.push(
                "entity-aware normalization unavailable; used lowercase and stopword removal only"
                    .to_string(),
            );
        }

        let resume_keywords = extract_keywords(&self.normalizer.normalize(resume_text));

        let (job, formatting) = tokio::join!(
            extract_job_keywords(job_text, &self.normalizer, generator, timeout),
            score_formatting(
                resume_text,
                rules,
                self.settings.formatting_strategy,
                generator,
                timeout,
            ),
        );

        if let Some(reason) = job.fallback_reason {
            notes.push(format!("{reason}; used deterministic job keywords"));
        }
        if let Some(reason) = formatting.fallback_reason {
            notes.push(format!("{reason}; formatting uses header presence only"));
        }

        let expanded = self.technology.expand(&job.keywords);
        if job_text.trim().is_empty() {
            notes.push("job description is empty; match score is 0".to_string());
        } else if expanded.is_empty() {
            notes.push("no keywords found in job description; match score is 0".to_string());
        }

        let matched = expanded.intersection(&resume_keywords);
        let missing = expanded.difference(&matched);
        let match_score = compute_match_score(&resume_keywords, &expanded);
        let final_score = compute_final_score(match_score, formatting.score);

        let (matched_summary, missing_summary) = match generator {
            Some(g) if self.settings.keyword_summaries => {
                let (m, x) = tokio::join!(
                    self.summarize(g, MATCHED_SUMMARY_PROMPT_TEMPLATE, &matched),
                    self.summarize(g, MISSING_SUMMARY_PROMPT_TEMPLATE, &missing),
                );
                (
                    m.unwrap_or_else(|e| {
                        notes.push(format!("matched keyword summary unavailable: {e}"));
                        None
                    }),
                    x.unwrap_or_else(|e| {
                        notes.push(format!("missing keyword summary unavailable: {e}"));
                        None
                    }),
                )
            }
            _ => (None, None),
        };

        info!(
            "Analysis complete: match={:.1} formatting={:.1} final={:.1} ({} matched, {} missing)",
            match_score,
            formatting.score,
            final_score,
            matched.len(),
            missing.len()
        );

        Ok(ScoreReport {
            match_score,
            matched_keywords: matched,
            missing_keywords: missing,
            formatting_score: formatting.score,
            formatting_reasons: formatting.reasons,
            final_score,
            heading_score: formatting.heading_score,
            star_score: formatting.star_score,
            rule_scores: formatting.rule_scores,
            formatting_strategy: formatting.strategy,
            resume_keywords,
            job_keywords: job.keywords,
            expanded_job_keywords: expanded,
            job_keyword_source: job.source,
            normalization: NormalizationInfo {
                strategy: self.normalizer.strategy(),
                degraded: self.normalizer.is_degraded(),
            },
            matched_summary,
            missing_summary,
            notes,
        })
    }

    /// One-sentence rendering of a keyword set. Empty sets are not sent.
    async fn summarize(
        &self,
        generator: &dyn TextGenerator,
        template: &str,
        keywords: &KeywordSet,
    ) -> Result<Option<String>, String> {
        if keywords.is_empty() {
            return Ok(None);
        }
        let prompt = template.replace("{keywords}", &keywords.joined());
        match generate_within(generator, &prompt, self.settings.llm_timeout).await {
            Ok(text) => {
                debug!("Keyword summary generated ({} chars)", text.len());
                Ok(Some(text.trim().to_string()))
            }
            Err(e) => {
                warn!("Keyword summary failed: {e}");
                Err(e.to_string())
            }
        }
    }
}
