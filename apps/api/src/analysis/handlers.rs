use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::engine::{AnalysisError, InputKind, ScoreReport};
use crate::analysis::formatting::FormattingRuleSet;
use crate::analysis::keywords::{extract_keywords, KeywordSet};
use crate::analysis::normalizer::{NormalizationStrategy, NormalizedText};
use crate::errors::AppError;
use crate::pdf::{extract_text_from_pdf, is_pdf};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume_text: Option<String>,
    pub job_text: Option<String>,
    /// Defaults to education / skills / experience.
    #[serde(default)]
    pub formatting_rules: Option<FormattingRuleSet>,
}

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NormalizeResponse {
    pub normalized_text: NormalizedText,
    pub keywords: KeywordSet,
    pub strategy: NormalizationStrategy,
    pub degraded: bool,
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ScoreReport>, AppError> {
    let resume = req
        .resume_text
        .ok_or(AnalysisError::InputUnavailable(InputKind::Resume))?;
    let job = req
        .job_text
        .ok_or(AnalysisError::InputUnavailable(InputKind::JobDescription))?;
    let rules = req.formatting_rules.unwrap_or_default();

    let report = state.engine.analyze(&resume, &job, &rules).await?;
    Ok(Json(report))
}

/// POST /api/v1/analyze/upload
///
/// Multipart fields: `resume` (PDF), `job_description` (PDF) or `job_text`,
/// optional `formatting_rules` (JSON). A job PDF wins over `job_text`.
pub async fn handle_analyze_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ScoreReport>, AppError> {
    let mut resume: Option<String> = None;
    let mut job_pdf: Option<String> = None;
    let mut job_text: Option<String> = None;
    let mut rules = FormattingRuleSet::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" | "job_description" => {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
                let text = pdf_field_text(&name, content_type.as_deref(), bytes.to_vec()).await?;
                if name == "resume" {
                    resume = Some(text);
                } else {
                    job_pdf = Some(text);
                }
            }
            "job_text" => {
                job_text = Some(
                    field.text().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read 'job_text': {e}"))
                    })?,
                );
            }
            "formatting_rules" => {
                let raw = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Failed to read 'formatting_rules': {e}"))
                })?;
                rules = serde_json::from_str(&raw).map_err(|e| {
                    AppError::Validation(format!("'formatting_rules' is not a valid rule set: {e}"))
                })?;
            }
            other => debug!("Ignoring unknown multipart field '{other}'"),
        }
    }

    let resume = resume.ok_or(AnalysisError::InputUnavailable(InputKind::Resume))?;
    let job = job_pdf
        .or(job_text)
        .ok_or(AnalysisError::InputUnavailable(InputKind::JobDescription))?;

    let report = state.engine.analyze(&resume, &job, &rules).await?;
    Ok(Json(report))
}

/// POST /api/v1/normalize
pub async fn handle_normalize(
    State(state): State<AppState>,
    Json(req): Json<NormalizeRequest>,
) -> Json<NormalizeResponse> {
    let normalizer = state.engine.normalizer();
    let normalized = normalizer.normalize(&req.text);
    let keywords = extract_keywords(&normalized);
    Json(NormalizeResponse {
        normalized_text: normalized,
        keywords,
        strategy: normalizer.strategy(),
        degraded: normalizer.is_degraded(),
    })
}

async fn pdf_field_text(
    field: &str,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<String, AppError> {
    if !is_pdf(content_type, &bytes) {
        return Err(AppError::Validation(format!("'{field}' must be a PDF file")));
    }
    let text = extract_text_from_pdf(bytes)
        .await
        .map_err(|e| AppError::PdfExtraction(format!("{field}: {e:#}")))?;
    debug!("Extracted {} chars from '{field}'", text.len());
    Ok(text)
}
