//! Built-in English stopword list.
//!
//! The standard list is the common NLTK English set. `CUSTOM_EXCLUSIONS` holds
//! tokens that are noise in job descriptions specifically.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

pub const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan",
    "shan't", "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't",
    "wouldn", "wouldn't",
];

/// Job-description noise that survives the standard list.
pub const CUSTOM_EXCLUSIONS: &[&str] = &["e.g.", "key", "requirement", "s", "or", "a", "in"];

/// The built-in stopword set: standard list plus custom exclusions.
pub fn builtin_stopwords() -> HashSet<String> {
    ENGLISH_STOPWORDS
        .iter()
        .chain(CUSTOM_EXCLUSIONS)
        .map(|w| w.to_string())
        .collect()
}

/// Loads a newline-separated stopword file. Blank lines and `#` comments are skipped.
/// The custom exclusions are always added on top.
pub fn load_stopwords(path: &Path) -> Result<HashSet<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stopword file '{}'", path.display()))?;

    let mut words: HashSet<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_lowercase)
        .collect();
    words.extend(CUSTOM_EXCLUSIONS.iter().map(|w| w.to_string()));
    Ok(words)
}
