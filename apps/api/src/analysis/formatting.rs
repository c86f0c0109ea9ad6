//! Formatting Scorer: rule-based section-header presence, optionally averaged
//! with a STAR-narrative verdict from the external text generator.
//!
//! Two named strategies:
//! - `Headers`: header-presence score only.
//! - `HeadersWithStar`: mean of header-presence score and STAR sub-score (0 or 100).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::prompts::STAR_CHECK_PROMPT_TEMPLATE;
use crate::llm_client::{generate_within, TextGenerator};

static RE_EDUCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\beducation\b").unwrap());

static RE_SKILLS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\w*skills\w*\b").unwrap());

static RE_EXPERIENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\w*experience\w*\b").unwrap());

// ────────────────────────────────────────────────────────────────────────────
// Rule set
// ────────────────────────────────────────────────────────────────────────────

/// A group of required headers. `weight` is earned per header found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub headers: Vec<String>,
    pub weight: f64,
}

/// Rule name → header rule. Scores are normalized by the total configured weight,
/// so weights need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormattingRuleSet {
    rules: BTreeMap<String, HeaderRule>,
}

impl Default for FormattingRuleSet {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            "section_headers".to_string(),
            HeaderRule {
                headers: vec![
                    "education".to_string(),
                    "skills".to_string(),
                    "experience".to_string(),
                ],
                weight: 100.0 / 3.0,
            },
        );
        Self::new(rules)
    }
}

impl FormattingRuleSet {
    pub fn new(rules: BTreeMap<String, HeaderRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> impl Iterator<Item = (&String, &HeaderRule)> {
        self.rules.iter()
    }

    /// Σ weight × |headers| across all rules.
    pub fn total_weight(&self) -> f64 {
        self.rules
            .values()
            .map(|r| r.weight * r.headers.len() as f64)
            .sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rules.is_empty() {
            return Err("formatting rules must contain at least one rule".to_string());
        }
        for (name, rule) in &self.rules {
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                return Err(format!(
                    "rule '{name}' has invalid weight {} (must be finite and >= 0)",
                    rule.weight
                ));
            }
            if rule.headers.is_empty() {
                return Err(format!("rule '{name}' lists no headers"));
            }
            if rule.headers.iter().any(|h| h.trim().is_empty()) {
                return Err(format!("rule '{name}' contains a blank header"));
            }
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Header presence
// ────────────────────────────────────────────────────────────────────────────

enum HeaderCheck {
    Education,
    Skills,
    Experience,
    Literal(String),
}

impl HeaderCheck {
    fn classify(header: &str) -> Self {
        let lower = header.trim().to_lowercase();
        if lower == "education" {
            HeaderCheck::Education
        } else if lower.contains("skills") {
            HeaderCheck::Skills
        } else if lower.contains("experience") {
            HeaderCheck::Experience
        } else {
            HeaderCheck::Literal(header.trim().to_string())
        }
    }

    fn is_present(&self, resume_text: &str) -> bool {
        match self {
            HeaderCheck::Education => RE_EDUCATION.is_match(resume_text),
            HeaderCheck::Skills => RE_SKILLS.is_match(resume_text),
            HeaderCheck::Experience => RE_EXPERIENCE.is_match(resume_text),
            HeaderCheck::Literal(header) => {
                let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(header));
                Regex::new(&pattern)
                    .map(|re| re.is_match(resume_text))
                    .unwrap_or(false)
            }
        }
    }

    fn missing_reason(&self) -> String {
        match self {
            HeaderCheck::Education => "Missing required header: education".to_string(),
            HeaderCheck::Skills => {
                "Missing a required header containing the word 'skills'".to_string()
            }
            HeaderCheck::Experience => {
                "Missing a required header containing the word 'experience'".to_string()
            }
            HeaderCheck::Literal(header) => format!("Missing required header: {header}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderScore {
    /// 0 – 100
    pub score: f64,
    pub reasons: Vec<String>,
    /// Rule name → accumulated weight.
    pub rule_scores: BTreeMap<String, f64>,
}

/// Checks every required header against the RAW resume text.
pub fn score_headers(resume_text: &str, rules: &FormattingRuleSet) -> HeaderScore {
    let mut accumulated = 0.0_f64;
    let mut reasons = Vec::new();
    let mut rule_scores = BTreeMap::new();

    for (name, rule) in rules.rules() {
        let mut rule_score = 0.0_f64;
        for header in &rule.headers {
            let check = HeaderCheck::classify(header);
            if check.is_present(resume_text) {
                rule_score += rule.weight;
            } else {
                reasons.push(check.missing_reason());
            }
        }
        accumulated += rule_score;
        rule_scores.insert(name.clone(), rule_score);
    }

    let total = rules.total_weight();
    let score = if total > 0.0 {
        (accumulated / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };

    HeaderScore {
        score,
        reasons,
        rule_scores,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// STAR verdict + strategy
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormattingStrategy {
    #[default]
    Headers,
    HeadersWithStar,
}

impl fmt::Display for FormattingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattingStrategy::Headers => write!(f, "headers"),
            FormattingStrategy::HeadersWithStar => write!(f, "headers_with_star"),
        }
    }
}

impl FromStr for FormattingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "headers" => Ok(FormattingStrategy::Headers),
            "headers_with_star" | "star" => Ok(FormattingStrategy::HeadersWithStar),
            other => Err(format!(
                "unknown formatting strategy '{other}' (expected 'headers' or 'headers_with_star')"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarVerdict {
    Yes,
    No,
}

impl StarVerdict {
    pub fn score(self) -> f64 {
        match self {
            StarVerdict::Yes => 100.0,
            StarVerdict::No => 0.0,
        }
    }
}

/// Accepts exactly "yes" or "no", ignoring case, whitespace and trailing punctuation.
pub fn parse_star_verdict(raw: &str) -> Option<StarVerdict> {
    let answer = raw
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_ascii_lowercase();
    match answer.as_str() {
        "yes" => Some(StarVerdict::Yes),
        "no" => Some(StarVerdict::No),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattingReport {
    /// Final formatting score, 0 – 100.
    pub score: f64,
    pub heading_score: f64,
    /// Present only when the STAR verdict was obtained.
    pub star_score: Option<f64>,
    pub reasons: Vec<String>,
    pub rule_scores: BTreeMap<String, f64>,
    pub strategy: FormattingStrategy,
    /// Set when the STAR strategy had to fall back to headers only.
    #[serde(skip)]
    pub fallback_reason: Option<String>,
}

pub async fn score_formatting(
    resume_text: &str,
    rules: &FormattingRuleSet,
    strategy: FormattingStrategy,
    generator: Option<&dyn TextGenerator>,
    timeout: Duration,
) -> FormattingReport {
    let headers = score_headers(resume_text, rules);

    let mut report = FormattingReport {
        score: headers.score,
        heading_score: headers.score,
        star_score: None,
        reasons: headers.reasons,
        rule_scores: headers.rule_scores,
        strategy,
        fallback_reason: None,
    };

    if strategy == FormattingStrategy::Headers {
        return report;
    }

    let Some(generator) = generator else {
        report.fallback_reason =
            Some("STAR check skipped: no text generator configured".to_string());
        return report;
    };

    let prompt = STAR_CHECK_PROMPT_TEMPLATE.replace("{resume_text}", resume_text);
    match generate_within(generator, &prompt, timeout).await {
        Ok(reply) => match parse_star_verdict(&reply) {
            Some(verdict) => {
                debug!("STAR verdict: {verdict:?}");
                let star = verdict.score();
                report.star_score = Some(star);
                report.score = ((report.heading_score + star) / 2.0).clamp(0.0, 100.0);
            }
            None => {
                let preview: String = reply.chars().take(40).collect();
                warn!("STAR check reply was not yes/no: {preview:?}");
                report.fallback_reason =
                    Some("STAR check returned an unparseable reply".to_string());
            }
        },
        Err(e) => {
            warn!("STAR check failed, using header score only: {e}");
            report.fallback_reason = Some(format!("STAR check service failed: {e}"));
        }
    }

    report
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{FailingGenerator, StaticGenerator};

    const FULL_RESUME: &str = "Jane Doe\nEDUCATION\nBSc Computer Science\n\
        Technical Skills: Rust, SQL\nWork Experience\nBuilt things.";

    fn rules(headers: &[&str], weight: f64) -> FormattingRuleSet {
        let mut map = BTreeMap::new();
        map.insert(
            "section_headers".to_string(),
            HeaderRule {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                weight,
            },
        );
        FormattingRuleSet::new(map)
    }

    #[test]
    fn test_all_headers_present_scores_100() {
        let result = score_headers(FULL_RESUME, &FormattingRuleSet::default());
        assert!((result.score - 100.0).abs() < 1e-9);
        assert!(result.reasons.is_empty());
        assert!((result.rule_scores["section_headers"] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_headers_scores_zero_with_three_reasons() {
        let result = score_headers("Jane Doe, builder of things", &FormattingRuleSet::default());
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reasons.len(), 3);
        assert!(result.reasons.iter().any(|r| r.contains("education")));
        assert!(result.reasons.iter().any(|r| r.contains("skills")));
        assert!(result.reasons.iter().any(|r| r.contains("experience")));
    }

    #[test]
    fn test_header_detection_is_case_insensitive() {
        let rules = FormattingRuleSet::default();
        let upper = score_headers("EDUCATION History", &rules);
        let lower = score_headers("education history", &rules);
        assert_eq!(upper, lower);
        assert!(upper.score > 0.0);
    }

    #[test]
    fn test_education_requires_whole_word() {
        let result = score_headers("Educational background", &rules(&["education"], 10.0));
        assert_eq!(result.score, 0.0);
        assert_eq!(result.reasons, vec!["Missing required header: education"]);
    }

    #[test]
    fn test_skills_and_experience_match_within_words() {
        let r = rules(&["skills", "work experience"], 5.0);
        let result = score_headers("SoftSkills and PriorExperiences", &r);
        assert!((result.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_match_normalizes_by_total_weight() {
        // 3 headers × 15 = 45 total; 2 present → 30 / 45
        let r = rules(&["skills", "experience", "education"], 15.0);
        let result = score_headers("Skills\nExperience", &r);
        assert!((result.score - 200.0 / 3.0).abs() < 1e-9);
        assert!((result.rule_scores["section_headers"] - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_literal_header_matches_word_bounded() {
        let r = rules(&["Projects"], 10.0);
        assert!((score_headers("PROJECTS\n- thing", &r).score - 100.0).abs() < 1e-9);
        let missing = score_headers("subprojectsx", &r);
        assert_eq!(missing.reasons, vec!["Missing required header: Projects"]);
    }

    #[test]
    fn test_zero_weight_rules_score_zero() {
        let result = score_headers(FULL_RESUME, &rules(&["education"], 0.0));
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_score_is_bounded() {
        let inputs = ["", FULL_RESUME, "skills skills skills", "EXPERIENCE"];
        for text in inputs {
            for weight in [0.0, 1.0, 100.0 / 3.0, 1e9] {
                let r = rules(&["education", "skills", "experience"], weight);
                let s = score_headers(text, &r).score;
                assert!((0.0..=100.0).contains(&s), "{s} out of bounds");
            }
        }
    }

    #[test]
    fn test_validate_rejects_bad_rules() {
        assert!(rules(&["education"], -1.0).validate().is_err());
        assert!(rules(&["education"], f64::NAN).validate().is_err());
        assert!(rules(&[], 10.0).validate().is_err());
        assert!(rules(&["  "], 10.0).validate().is_err());
        assert!(FormattingRuleSet::new(BTreeMap::new()).validate().is_err());
        assert!(FormattingRuleSet::default().validate().is_ok());
    }

    #[test]
    fn test_rule_set_deserializes_from_json() {
        let rules: FormattingRuleSet = serde_json::from_str(
            r#"{"section_headers":
                {"headers": ["skills", "experience", "education"], "weight": 15}}"#,
        )
        .unwrap();
        assert!((rules.total_weight() - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_star_verdict() {
        assert_eq!(parse_star_verdict("Yes"), Some(StarVerdict::Yes));
        assert_eq!(parse_star_verdict(" no.\n"), Some(StarVerdict::No));
        assert_eq!(parse_star_verdict("YES!"), Some(StarVerdict::Yes));
        assert_eq!(parse_star_verdict("Yes, mostly"), None);
        assert_eq!(parse_star_verdict(""), None);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "headers".parse::<FormattingStrategy>().unwrap(),
            FormattingStrategy::Headers
        );
        assert_eq!(
            "headers-with-star".parse::<FormattingStrategy>().unwrap(),
            FormattingStrategy::HeadersWithStar
        );
        assert!("vibes".parse::<FormattingStrategy>().is_err());
    }

    // Header-presence strategy: the generator is never consulted.
    #[tokio::test]
    async fn test_headers_strategy_ignores_generator() {
        let generator = StaticGenerator::new("yes");
        let report = score_formatting(
            "Skills only",
            &FormattingRuleSet::default(),
            FormattingStrategy::Headers,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert!((report.score - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(report.star_score, None);
        assert_eq!(generator.prompt_count(), 0);
    }

    // STAR strategy: final = mean(header score, STAR score).
    #[tokio::test]
    async fn test_star_strategy_yes_averages_with_100() {
        let generator = StaticGenerator::new("yes");
        let report = score_formatting(
            "Skills only",
            &FormattingRuleSet::default(),
            FormattingStrategy::HeadersWithStar,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.star_score, Some(100.0));
        assert!((report.score - (100.0 / 3.0 + 100.0) / 2.0).abs() < 1e-9);
        assert!((report.heading_score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_star_strategy_no_halves_header_score() {
        let generator = StaticGenerator::new("No");
        let report = score_formatting(
            FULL_RESUME,
            &FormattingRuleSet::default(),
            FormattingStrategy::HeadersWithStar,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.star_score, Some(0.0));
        assert!((report.score - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_star_strategy_failure_falls_back_to_headers() {
        let report = score_formatting(
            FULL_RESUME,
            &FormattingRuleSet::default(),
            FormattingStrategy::HeadersWithStar,
            Some(&FailingGenerator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.star_score, None);
        assert!((report.score - 100.0).abs() < 1e-9);
        assert!(report.fallback_reason.is_some());
    }

    #[tokio::test]
    async fn test_star_strategy_unparseable_reply_falls_back() {
        let generator = StaticGenerator::new("It depends on the section.");
        let report = score_formatting(
            FULL_RESUME,
            &FormattingRuleSet::default(),
            FormattingStrategy::HeadersWithStar,
            Some(&generator),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.star_score, None);
        assert!(report.fallback_reason.unwrap().contains("unparseable"));
    }

    #[tokio::test]
    async fn test_star_strategy_without_generator_notes_skip() {
        let report = score_formatting(
            FULL_RESUME,
            &FormattingRuleSet::default(),
            FormattingStrategy::HeadersWithStar,
            None,
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(report.star_score, None);
        assert!(report.fallback_reason.unwrap().contains("no text generator"));
    }
}
