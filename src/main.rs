//! Woezɔr - an Ewe-speaking chat assistant
//!
//! Forwards typed or spoken messages to Gemini, constrains replies to Ewe and
//! speaks them back through a hosted text-to-speech Space.

mod api;
mod config;
mod llm;
mod locale;
mod prompts;
mod runtime;
mod session;
mod speech;
mod state_machine;
mod translation;

use api::{create_router, AppState};
use config::AppConfig;
use llm::{GeminiService, LlmService, LoggingService};
use prompts::Persona;
use runtime::{Services, SessionSettings};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "woezor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env()?;

    // Completion service
    if config.gemini.api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; every reply will be the failure message");
    }
    let gemini: Arc<dyn LlmService> = Arc::new(GeminiService::new(&config.gemini)?);
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(gemini));
    tracing::info!(model = %llm.model_id(), "Completion service ready");

    std::fs::create_dir_all(&config.audio_dir)?;
    tracing::info!(path = %config.audio_dir.display(), "Audio directory");

    // Speech services are connected once; a failure disables the capability
    let synthesizer = match speech::connect_synthesizer(
        &config.tts_space,
        &config.tts_api,
        config.hf_token.clone(),
    )
    .await
    {
        Ok(synthesizer) => Some(synthesizer),
        Err(e) => {
            tracing::error!(
                space = %config.tts_space,
                kind = ?e.kind,
                error = %e,
                "Speech synthesis unavailable"
            );
            None
        }
    };

    let recognizer = match &config.asr_space {
        Some(space) => {
            let staging_dir = config.audio_dir.join("clips");
            std::fs::create_dir_all(&staging_dir)?;
            match speech::connect_recognizer(
                space,
                &config.asr_api,
                config.hf_token.clone(),
                &staging_dir,
            )
            .await
            {
                Ok(recognizer) => Some(recognizer),
                Err(e) => {
                    tracing::error!(
                        space = %space,
                        kind = ?e.kind,
                        error = %e,
                        "Speech recognition unavailable"
                    );
                    None
                }
            }
        }
        None => {
            tracing::info!("WOEZOR_ASR_SPACE is not set; voice input disabled");
            None
        }
    };

    let persona = Persona {
        language: config.language.clone(),
        ..Persona::default()
    };
    let services = Services {
        llm,
        synthesizer,
        recognizer,
    };
    let settings = SessionSettings {
        persona,
        language: config.language.clone(),
        speaker: config.speaker.clone(),
        audio_root: config.audio_dir.clone(),
        idle_limit: config.session_idle,
    };

    // Create application state
    let state = AppState::new(services, settings);
    state.runtime.start_reaper();

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Woezɔr server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
