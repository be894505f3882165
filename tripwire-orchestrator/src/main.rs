use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::service::launcher::{DEFAULT_SUBMIT_TIMEOUT, HttpLauncher, LogLauncher, TrainingLauncher};
use crate::service::notification::{LogPublisher, NotificationDispatcher, Publisher, WebhookPublisher};
use crate::service::{Engine, Orchestrator};

pub mod api;
pub mod config;
pub mod repository;
pub mod service;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tripwire_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tripwire Orchestrator...");

    let config = config::Config::load()?;
    config.validate().context("Invalid configuration")?;

    let launcher: Arc<dyn TrainingLauncher> = match &config.launcher.worker_url {
        Some(url) => {
            tracing::info!("Training jobs go to worker at {}", url);
            Arc::new(HttpLauncher::new(url.clone(), DEFAULT_SUBMIT_TIMEOUT)?)
        }
        None => {
            tracing::info!("No training worker configured, jobs are only logged");
            Arc::new(LogLauncher)
        }
    };

    let publisher: Arc<dyn Publisher> = if config.notification.subscribers.is_empty() {
        Arc::new(LogPublisher)
    } else {
        Arc::new(WebhookPublisher::new(config.notification.subscribers.clone()))
    };

    let engine = Engine::new(launcher, config.default_parameters());

    for definition in config.pipelines.iter().cloned() {
        let name = definition.name.clone();
        engine
            .register(definition)
            .with_context(|| format!("Configured pipeline '{}' is invalid", name))?;
    }

    for rule in &config.rules {
        if engine.pipeline(&rule.pipeline_name).is_none() {
            tracing::warn!(
                "Rule '{}' targets pipeline '{}', which is not registered yet",
                rule.name,
                rule.pipeline_name
            );
        }
    }

    let orchestrator = Orchestrator::new(
        engine.clone(),
        &config.rules,
        NotificationDispatcher::new(config.notification.topic.clone(), publisher),
    );
    tracing::info!(
        "Loaded {} trigger rule(s), notifying topic '{}'",
        orchestrator.rules().count(),
        config.notification.topic
    );

    // Build router with all API endpoints
    let app = api::create_router(api::AppState {
        engine,
        orchestrator: Arc::new(orchestrator),
    });

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
