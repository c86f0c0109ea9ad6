mod analysis;
mod config;
mod errors;
mod llm_client;
mod pdf;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::engine::{EngineSettings, MatchEngine};
use crate::analysis::normalizer::{NlpToolkit, Normalizer};
use crate::analysis::stopwords::{builtin_stopwords, load_stopwords};
use crate::analysis::technology::TechnologyMapping;
use crate::config::Config;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Stopwords + stemmer, shared read-only
    let stopwords = match &config.stopwords_path {
        Some(path) => load_stopwords(path)?,
        None => builtin_stopwords(),
    };
    info!("Loaded {} stopwords", stopwords.len());
    let toolkit = Arc::new(NlpToolkit::new(stopwords, &config.stemmer_language));
    let normalizer = Normalizer::new(toolkit, config.keyword_strategy);

    let technology = match &config.technology_mapping_path {
        Some(path) => TechnologyMapping::from_json_file(path)?,
        None => TechnologyMapping::builtin(),
    };
    if technology.is_empty() {
        warn!("Technology mapping is empty: job keywords will not be expanded");
    } else {
        info!("Technology mapping: {} topics", technology.len());
    }

    let generator: Option<Arc<dyn TextGenerator>> = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), config.llm_timeout)
                .context("Failed to build LLM HTTP client")?;
            info!("LLM client initialized (model: {})", llm_client::MODEL);
            Some(Arc::new(client) as Arc<dyn TextGenerator>)
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set: job keywords use deterministic extraction only");
            None
        }
    };

    let engine = MatchEngine::new(
        normalizer,
        &technology,
        generator,
        EngineSettings {
            formatting_strategy: config.formatting_strategy,
            llm_timeout: config.llm_timeout,
            keyword_summaries: config.keyword_summaries,
        },
    );
    info!(
        "Strategies: keywords={} formatting={}",
        config.keyword_strategy, config.formatting_strategy
    );

    let state = AppState {
        engine: Arc::new(engine),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        // TODO: restrict origins once the web client has a fixed host
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
