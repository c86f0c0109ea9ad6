//! Text Normalizer: canonicalizes raw extracted text into a space-joined token stream.
//!
//! Two strategies:
//! - `Plain`: lowercase, strip punctuation, drop stopwords.
//! - `EntityAware`: month expansion, URL/navigation stripping, email and phone
//!   protection, stopword filtering and stemming.
//!
//! Both are idempotent on the token set: `normalize(normalize(x)) == normalize(x)`.
//! `EntityAware` falls back to a reduced pipeline when the toolkit has no stemmer.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MONTHS: [(&str, &str); 12] = [
    ("Jan", "January"),
    ("Feb", "February"),
    ("Mar", "March"),
    ("Apr", "April"),
    ("May", "May"),
    ("Jun", "June"),
    ("Jul", "July"),
    ("Aug", "August"),
    ("Sep", "September"),
    ("Oct", "October"),
    ("Nov", "November"),
    ("Dec", "December"),
];

/// Upper bound on repeated stemming. Snowball stems converge in one or two passes.
const MAX_STEM_PASSES: usize = 8;

static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\b").unwrap()
});

static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").unwrap());

static RE_NAV_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:linkedin|github|envel|obile)[a-z]*").unwrap());

static RE_NAV_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:linkedin|github|envel|obile)").unwrap());

static RE_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

// Anchored so a number never starts or ends inside a word such as "python3".
static RE_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\B\+|\b)\d[\d -]{7,}\d\b").unwrap());

// ────────────────────────────────────────────────────────────────────────────
// Strategy + toolkit
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    Plain,
    #[default]
    EntityAware,
}

impl fmt::Display for NormalizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationStrategy::Plain => write!(f, "plain"),
            NormalizationStrategy::EntityAware => write!(f, "entity_aware"),
        }
    }
}

impl FromStr for NormalizationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "plain" => Ok(NormalizationStrategy::Plain),
            "entity_aware" | "entity" | "nlp" => Ok(NormalizationStrategy::EntityAware),
            other => Err(format!(
                "unknown keyword strategy '{other}' (expected 'plain' or 'entity_aware')"
            )),
        }
    }
}

/// Stopword list and stemmer, built once at startup and shared read-only.
pub struct NlpToolkit {
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
    language: Option<String>,
}

impl fmt::Debug for NlpToolkit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NlpToolkit")
            .field("stopwords", &self.stopwords.len())
            .field("stemmer", &self.language)
            .finish()
    }
}

impl NlpToolkit {
    /// Builds a toolkit for the named Snowball language.
    /// `none`, `off`, or an unsupported name yields a toolkit without a stemmer.
    pub fn new(stopwords: HashSet<String>, language: &str) -> Self {
        let language = language.trim().to_ascii_lowercase();
        match stemmer_algorithm(&language) {
            Some(algorithm) => {
                info!("NLP toolkit: {} stopwords, stemmer={language}", stopwords.len());
                Self {
                    stopwords,
                    stemmer: Some(Stemmer::create(algorithm)),
                    language: Some(language),
                }
            }
            None => {
                if !matches!(language.as_str(), "none" | "off" | "") {
                    warn!(
                        "Unsupported stemmer language '{language}'; normalization will run degraded"
                    );
                }
                Self::without_stemmer(stopwords)
            }
        }
    }

    /// Built-in English stopwords with the English Snowball stemmer.
    #[cfg(test)]
    pub fn english() -> Self {
        Self::new(crate::analysis::stopwords::builtin_stopwords(), "english")
    }

    pub fn without_stemmer(stopwords: HashSet<String>) -> Self {
        Self {
            stopwords,
            stemmer: None,
            language: None,
        }
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    pub fn has_stemmer(&self) -> bool {
        self.stemmer.is_some()
    }

    /// Stems until the output stops changing, so re-stemming a stem is a no-op.
    fn stem(&self, token: &str) -> String {
        let Some(stemmer) = &self.stemmer else {
            return token.to_string();
        };
        let mut current = token.to_string();
        for _ in 0..MAX_STEM_PASSES {
            let next = stemmer.stem(&current).into_owned();
            if next == current {
                break;
            }
            current = next;
        }
        current
    }
}

fn stemmer_algorithm(language: &str) -> Option<Algorithm> {
    let algorithm = match language {
        "english" | "en" | "porter" => Algorithm::English,
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "finnish" => Algorithm::Finnish,
        "french" | "fr" => Algorithm::French,
        "german" | "de" => Algorithm::German,
        "hungarian" => Algorithm::Hungarian,
        "italian" | "it" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" | "pt" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" | "ru" => Algorithm::Russian,
        "spanish" | "es" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "turkish" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}

// ────────────────────────────────────────────────────────────────────────────
// NormalizedText
// ────────────────────────────────────────────────────────────────────────────

/// Space-joined normalized tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    fn from_tokens(tokens: Vec<String>) -> Self {
        Self(tokens.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Normalizer
// ────────────────────────────────────────────────────────────────────────────

/// A piece of text after protection: either strippable prose or a verbatim entity.
enum Segment {
    Text(String),
    Email(String),
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    toolkit: Arc<NlpToolkit>,
    strategy: NormalizationStrategy,
}

impl Normalizer {
    pub fn new(toolkit: Arc<NlpToolkit>, strategy: NormalizationStrategy) -> Self {
        let normalizer = Self { toolkit, strategy };
        if normalizer.is_degraded() {
            warn!(
                "Stemmer unavailable: entity-aware normalization degraded to \
                 lowercase + stopword removal"
            );
        }
        normalizer
    }

    pub fn strategy(&self) -> NormalizationStrategy {
        self.strategy
    }

    /// True when the entity-aware pipeline has to run without a stemmer.
    pub fn is_degraded(&self) -> bool {
        self.strategy == NormalizationStrategy::EntityAware && !self.toolkit.has_stemmer()
    }

    /// Normalizes raw text. Never fails; empty input yields empty output.
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        match self.strategy {
            NormalizationStrategy::Plain => self.normalize_plain(raw),
            NormalizationStrategy::EntityAware if self.toolkit.has_stemmer() => {
                self.normalize_entity_aware(raw)
            }
            NormalizationStrategy::EntityAware => self.normalize_reduced(raw),
        }
    }

    fn normalize_plain(&self, raw: &str) -> NormalizedText {
        let cleaned: String = raw
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .collect();

        let tokens = cleaned
            .split_whitespace()
            .filter(|t| !self.toolkit.is_stopword(t))
            .map(str::to_string)
            .collect();
        NormalizedText::from_tokens(tokens)
    }

    /// Month expansion, URL stripping, lowercase and stopword removal; identity stem.
    fn normalize_reduced(&self, raw: &str) -> NormalizedText {
        let text = strip_urls(&expand_months(raw)).to_lowercase();
        let tokens = text
            .split_whitespace()
            .filter(|t| !self.toolkit.is_stopword(t))
            .map(str::to_string)
            .collect();
        NormalizedText::from_tokens(tokens)
    }

    fn normalize_entity_aware(&self, raw: &str) -> NormalizedText {
        let text = expand_months(raw);
        let text = strip_urls(&text);
        let text = RE_NAV_TERM.replace_all(&text, "");

        let mut tokens = Vec::new();
        for segment in protect_and_strip(&text) {
            match segment {
                Segment::Email(email) => tokens.push(email.to_lowercase()),
                Segment::Text(prose) => {
                    for token in prose.to_lowercase().split_whitespace() {
                        if !self.keep_token(token) {
                            continue;
                        }
                        let stemmed = self.toolkit.stem(token);
                        if self.keep_token(&stemmed) {
                            tokens.push(stemmed);
                        }
                    }
                }
            }
        }
        NormalizedText::from_tokens(tokens)
    }

    fn keep_token(&self, token: &str) -> bool {
        token.chars().count() > 1
            && token.chars().all(char::is_alphanumeric)
            && !self.toolkit.is_stopword(token)
            && !RE_NAV_TOKEN.is_match(token)
    }
}

fn expand_months(text: &str) -> String {
    RE_MONTH
        .replace_all(text, |caps: &regex::Captures| {
            let abbr = &caps[1];
            MONTHS
                .iter()
                .find(|(short, _)| *short == abbr)
                .map(|(_, full)| full.to_string())
                .unwrap_or_else(|| abbr.to_string())
        })
        .into_owned()
}

fn strip_urls(text: &str) -> String {
    RE_URL.replace_all(text, "").into_owned()
}

/// Splits text around emails, which become entities. Prose between them has
/// every character other than alphanumerics, whitespace, `@` and `.` replaced
/// by a space, except inside phone numbers, which are carried through verbatim.
fn protect_and_strip(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for email in RE_EMAIL.find_iter(text) {
        push_prose(&text[last..email.start()], &mut segments);
        segments.push(Segment::Email(email.as_str().to_string()));
        last = email.end();
    }

    push_prose(&text[last..], &mut segments);
    segments
}

fn push_prose(prose: &str, segments: &mut Vec<Segment>) {
    if prose.is_empty() {
        return;
    }
    let mut buffer = String::with_capacity(prose.len());
    let mut last = 0;
    for phone in RE_PHONE.find_iter(prose) {
        strip_into(&prose[last..phone.start()], &mut buffer);
        buffer.push_str(phone.as_str());
        last = phone.end();
    }
    strip_into(&prose[last..], &mut buffer);
    segments.push(Segment::Text(buffer));
}

fn strip_into(prose: &str, out: &mut String) {
    out.extend(prose.chars().map(|c| {
        if c.is_alphanumeric() || c.is_whitespace() || c == '@' || c == '.' {
            c
        } else {
            ' '
        }
    }));
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::stopwords::builtin_stopwords;

    fn entity_aware() -> Normalizer {
        Normalizer::new(
            Arc::new(NlpToolkit::english()),
            NormalizationStrategy::EntityAware,
        )
    }

    fn plain() -> Normalizer {
        Normalizer::new(Arc::new(NlpToolkit::english()), NormalizationStrategy::Plain)
    }

    fn degraded() -> Normalizer {
        Normalizer::new(
            Arc::new(NlpToolkit::without_stemmer(builtin_stopwords())),
            NormalizationStrategy::EntityAware,
        )
    }

    fn token_set(text: &NormalizedText) -> HashSet<String> {
        text.tokens().map(str::to_string).collect()
    }

    const RESUME: &str = "Jane Doe | jane.doe@example.com | +1 555-123-4567\n\
        linkedin.com/in/janedoe github.com/janedoe https://janedoe.dev\n\
        EXPERIENCE\nSenior Engineer, Acme Corp (Jan 2019 - Mar 2022)\n\
        • Built distributed data pipelines in Python and SQL, reducing costs by 30%.\n\
        SKILLS: Python, Pandas, Kubernetes, Docker\nEDUCATION\nB.Sc. Computer Science";

    #[test]
    fn test_month_abbreviations_expand_case_sensitively() {
        assert_eq!(expand_months("Jan 2020 to Dec 2021"), "January 2020 to December 2021");
        assert_eq!(expand_months("jan stays"), "jan stays");
        assert_eq!(expand_months("Janet"), "Janet");
    }

    #[test]
    fn test_urls_are_stripped() {
        let out = strip_urls("see https://example.com/x and www.foo.org/bar now");
        assert!(!out.contains("example"));
        assert!(!out.contains("foo.org"));
        assert!(out.contains("see"));
        assert!(out.contains("now"));
    }

    #[test]
    fn test_entity_aware_keeps_email_as_single_token() {
        let out = entity_aware().normalize(RESUME);
        assert!(token_set(&out).contains("jane.doe@example.com"));
    }

    #[test]
    fn test_entity_aware_drops_navigation_terms() {
        let out = entity_aware().normalize(RESUME);
        let tokens = token_set(&out);
        assert!(tokens.iter().all(|t| !t.starts_with("linkedin")));
        assert!(tokens.iter().all(|t| !t.starts_with("github")));
        assert!(!tokens.contains("janedoe.dev"));
    }

    #[test]
    fn test_entity_aware_stems_and_drops_stopwords() {
        let out = entity_aware().normalize("The engineers were building pipelines");
        let tokens = token_set(&out);
        assert!(tokens.contains("engin"));
        assert!(tokens.contains("build"));
        assert!(tokens.contains("pipelin"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("were"));
    }

    #[test]
    fn test_entity_aware_expands_months_before_lowercasing() {
        let out = entity_aware().normalize("Started Jan 2019");
        assert!(token_set(&out).contains("januari"));
        assert!(token_set(&out).contains("2019"));
    }

    #[test]
    fn test_entity_aware_drops_single_characters_and_symbols() {
        let out = entity_aware().normalize("C & R x-y ++");
        assert!(out.is_empty(), "got '{out}'");
    }

    #[test]
    fn test_phone_digits_survive_character_stripping() {
        let out = entity_aware().normalize("Call 555 123 4567 today");
        let tokens = token_set(&out);
        assert!(tokens.contains("555"));
        assert!(tokens.contains("4567"));
    }

    #[test]
    fn test_entity_aware_is_idempotent() {
        let n = entity_aware();
        let once = n.normalize(RESUME);
        let twice = n.normalize(once.as_str());
        assert_eq!(token_set(&once), token_set(&twice));
    }

    #[test]
    fn test_plain_is_idempotent() {
        let n = plain();
        let once = n.normalize(RESUME);
        let twice = n.normalize(once.as_str());
        assert_eq!(token_set(&once), token_set(&twice));
    }

    #[test]
    fn test_degraded_is_idempotent() {
        let n = degraded();
        let once = n.normalize(RESUME);
        let twice = n.normalize(once.as_str());
        assert_eq!(token_set(&once), token_set(&twice));
    }

    const TRICKY_INPUTS: &[&str] = &[
        "Tools: Python3, 2019 2020 projects",
        "Windows10/2019 2020",
        "x²12345678_ later",
        "2019, 1234-5678@example.com",
        "(jane.doe@example.com), Jan 2020; bob@x.io.",
        "john.github@example.com and linkedin.com/in/john",
        "githubber@mail.com obile envelope",
        "a@b.co2019 call +1 (555) 123-4567 or 555 123 4567!",
        "Jan.doe@corp.com www.site.com/me@x.com",
        "python3.10 c++17 node.js_2020 12345678901",
    ];

    #[test]
    fn test_idempotent_on_tricky_inputs() {
        for normalizer in [entity_aware(), plain(), degraded()] {
            for input in TRICKY_INPUTS {
                let once = normalizer.normalize(input);
                let twice = normalizer.normalize(once.as_str());
                assert_eq!(
                    token_set(&once),
                    token_set(&twice),
                    "{:?} not idempotent on {input:?}",
                    normalizer.strategy()
                );
            }
        }
    }

    #[test]
    fn test_digits_glued_to_words_stay_whole() {
        let n = entity_aware();
        let tokens = token_set(&n.normalize("Tools: Python3, 2019 2020 projects"));
        assert!(tokens.contains("python3"), "{tokens:?}");
        assert!(tokens.contains("2019"));
        assert!(tokens.contains("2020"));

        let tokens = token_set(&n.normalize("Windows10/2019 2020"));
        assert!(tokens.contains("windows10"), "{tokens:?}");
    }

    #[test]
    fn test_email_wins_over_preceding_digits() {
        let tokens = token_set(&entity_aware().normalize("2019, 1234-5678@example.com"));
        assert!(tokens.contains("1234-5678@example.com"), "{tokens:?}");
        assert!(tokens.contains("2019"));
    }

    #[test]
    fn test_plain_strips_punctuation_without_stemming() {
        let out = plain().normalize("Python, SQL & Pandas; building things!");
        let tokens = token_set(&out);
        assert!(tokens.contains("python"));
        assert!(tokens.contains("pandas"));
        assert!(tokens.contains("building"));
        assert!(!tokens.iter().any(|t| t.contains(',')));
    }

    #[test]
    fn test_degraded_path_lowercases_and_skips_stemming() {
        let n = degraded();
        assert!(n.is_degraded());
        let out = n.normalize("Building Pipelines since Jan 2020 https://x.io");
        let tokens = token_set(&out);
        assert!(tokens.contains("building"));
        assert!(tokens.contains("pipelines"));
        assert!(tokens.contains("january"));
        assert!(!tokens.iter().any(|t| t.contains("x.io")));
    }

    #[test]
    fn test_unknown_language_yields_degraded_toolkit() {
        let toolkit = NlpToolkit::new(builtin_stopwords(), "klingon");
        assert!(!toolkit.has_stemmer());
        let toolkit = NlpToolkit::new(builtin_stopwords(), "none");
        assert!(!toolkit.has_stemmer());
    }

    #[test]
    fn test_plain_strategy_is_never_degraded() {
        let n = Normalizer::new(
            Arc::new(NlpToolkit::without_stemmer(builtin_stopwords())),
            NormalizationStrategy::Plain,
        );
        assert!(!n.is_degraded());
    }

    #[test]
    fn test_empty_input_normalizes_to_empty() {
        assert!(entity_aware().normalize("").is_empty());
        assert!(plain().normalize("   ").is_empty());
        assert!(degraded().normalize("").is_empty());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "plain".parse::<NormalizationStrategy>().unwrap(),
            NormalizationStrategy::Plain
        );
        assert_eq!(
            "Entity-Aware".parse::<NormalizationStrategy>().unwrap(),
            NormalizationStrategy::EntityAware
        );
        assert!("fuzzy".parse::<NormalizationStrategy>().is_err());
    }
}
