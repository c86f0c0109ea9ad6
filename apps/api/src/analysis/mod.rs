//! Resume ↔ job description analysis.
//!
//! Pipeline: normalize → extract keywords → expand job topics → intersect,
//! plus rule-based formatting. `engine::MatchEngine` ties the stages together.

pub mod engine;
pub mod formatting;
pub mod handlers;
pub mod keywords;
pub mod normalizer;
pub mod prompts;
pub mod stopwords;
pub mod technology;
