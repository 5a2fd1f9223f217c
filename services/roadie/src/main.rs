use std::sync::Arc;

use anyhow::Context;
use google_calendar::{GoogleCalendarClient, StaticToken};
use roadie::ai_adapter::{WorkersAiInference, WorkersAiTranscriber};
use roadie::calendar_adapter::GoogleCalendar;
use roadie::config::Config;
use roadie::routes;
use roadie::state::AppState;
use roadie_core::agent::SchedulingAgent;
use roadie_core::pipeline::PipelineDeadlines;
use tracing_subscriber::fmt::time::ChronoLocal;
use workers_ai::WorkersAiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let workers_ai = Arc::new(WorkersAiClient::new(
        config.cf_account_id.clone(),
        config.cf_api_token.clone(),
    ));
    let calendar = GoogleCalendarClient::new(
        Arc::new(StaticToken::new(config.google_access_token.clone())),
        config.google_calendar_id.clone(),
    );

    let transcriber = Arc::new(WorkersAiTranscriber::new(
        workers_ai.clone(),
        config.transcription_model.clone(),
    ));
    let generator = Arc::new(SchedulingAgent::new(
        Arc::new(WorkersAiInference::new(workers_ai)),
        Arc::new(GoogleCalendar::new(calendar)),
        config.chat_model.clone(),
    ));

    let state = AppState::new(
        config.data_dir.clone(),
        transcriber,
        generator,
        PipelineDeadlines {
            transcription: config.transcribe_timeout,
            generation: config.generate_timeout,
        },
    );
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "roadie listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
    }
}
