//! chatterbox server binary.
//!
//! Reads configuration from `CHATTERBOX__*` environment variables, connects
//! to PostgreSQL, and serves the chat API until Ctrl-C.

use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use tracing_subscriber::EnvFilter;

use chatterbox::adapters::ai::{OpenAIConfig, OpenAIProvider};
use chatterbox::adapters::auth::{OidcConfig, OidcSessionValidator};
use chatterbox::adapters::http::{with_http_layers, Services};
use chatterbox::adapters::postgres::{PostgresConversationStore, PostgresUserRepository};
use chatterbox::application::{seed_demo_data, ReconcilerConfig, SessionRegistry, StreamReconciler};
use chatterbox::config::AppConfig;
use chatterbox::ports::{CompletionProvider, ConversationStore, SessionValidator, UserRepository};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(database = %config.database.redacted_url(), "connecting to database");
    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("migrations applied");
    }

    let store: Arc<dyn ConversationStore> = Arc::new(PostgresConversationStore::new(pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PostgresUserRepository::new(pool));

    if config.database.seed {
        if let Some(conversation) = seed_demo_data(users.as_ref(), store.as_ref()).await? {
            tracing::info!(conversation_id = %conversation.id(), "seeded demo data");
        }
    }

    let provider: Arc<dyn CompletionProvider> = Arc::new(openai_provider(&config)?);
    let validator: Arc<dyn SessionValidator> = Arc::new(oidc_validator(&config)?);

    let registry = Arc::new(SessionRegistry::new(store.clone()));
    let _sweeper = registry
        .clone()
        .spawn_sweeper(config.session.sweep_interval(), config.session.idle_timeout());

    let reconciler = Arc::new(StreamReconciler::new(
        provider,
        store.clone(),
        ReconcilerConfig {
            system_prompt: config.ai.system_prompt.clone(),
            max_tokens: config.ai.max_tokens,
            temperature: None,
            event_buffer: config.session.stream_buffer,
        },
    ));

    let router = Services {
        store,
        users,
        registry,
        reconciler,
        validator,
    }
    .into_router();
    let app = with_http_layers(
        router,
        &config.server.cors_origins_list(),
        config.server.request_timeout(),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = %config.server.environment, "chatterbox listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.server.log_json() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn openai_provider(config: &AppConfig) -> Result<OpenAIProvider, Box<dyn std::error::Error>> {
    let key = config
        .ai
        .openai_api_key
        .as_ref()
        .ok_or("CHATTERBOX__AI__OPENAI_API_KEY is not set")?;

    let provider = OpenAIProvider::new(
        OpenAIConfig::new(Secret::new(key.expose_secret().clone()))
            .with_model(config.ai.model.clone())
            .with_base_url(config.ai.base_url.clone())
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    )?;
    Ok(provider)
}

fn oidc_validator(config: &AppConfig) -> Result<OidcSessionValidator, Box<dyn std::error::Error>> {
    let oidc = match &config.auth.audience {
        Some(audience) => OidcConfig::new(config.auth.issuer.clone(), audience.clone()),
        None => OidcConfig::new(config.auth.issuer.clone(), String::new()).without_audience(),
    }
    .with_cache_ttl(config.auth.jwks_cache_ttl());

    Ok(OidcSessionValidator::new(oidc)?)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}
