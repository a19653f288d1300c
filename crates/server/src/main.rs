mod clients;
mod config;
mod error;
mod routes;
mod storage;
mod sweep;
#[cfg(test)]
mod test_support;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use clients::Adapters;
use config::AppConfig;
use storage::Db;

/// Application state shared across all handlers and the sweep task.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub adapters: Adapters,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Adapters {
    fn from_ref(state: &AppState) -> Self {
        state.adapters.clone()
    }
}

fn build_adapters(http: reqwest::Client, config: &AppConfig) -> Adapters {
    Adapters {
        identity: Arc::new(clients::clerk::ClerkClient::new(
            http.clone(),
            config.clerk_api_url.clone(),
            config.clerk_secret_key.clone(),
        )),
        store: Arc::new(clients::supabase::SupabaseStorage::new(
            http.clone(),
            config.storage_url.clone(),
            config.storage_service_key.clone(),
            config.storage_bucket.clone(),
        )),
        inference: Arc::new(clients::hf::HfInference::new(
            http.clone(),
            config.whisper_url.clone(),
            config.llm_url.clone(),
            config.hf_token.clone(),
        )),
        mailer: Arc::new(clients::resend::ResendMailer::new(
            http.clone(),
            config.resend_api_key.clone(),
            config.from_address(),
        )),
        inbox: config.inbound_api.as_ref().map(|inbound| {
            Arc::new(clients::inbox::HttpMailbox::new(
                http.clone(),
                inbound.url.clone(),
                inbound.api_key.clone(),
            )) as Arc<dyn clients::InboundMailbox>
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remotesync_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    tracing::info!("data directory: {}", config.data_dir.display());
    let db = storage::init_db(&config.data_dir)?;
    tracing::info!("database initialized");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let adapters = build_adapters(http, &config);
    if adapters.inbox.is_none() {
        tracing::info!("inbound mailbox not configured, reply ingestion disabled");
    }

    let state = AppState {
        db,
        config: config.clone(),
        adapters,
    };

    // Build API routes
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Entries
        .route("/entry", post(routes::entries::submit_entry))
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024)) // audio uploads
        // Teams
        .route("/teams", post(routes::teams::create_team))
        .route("/teams/{team_id}", delete(routes::teams::delete_team))
        .route(
            "/teams/{team_id}/settings",
            put(routes::teams::update_settings),
        )
        .route(
            "/teams/{team_id}/members",
            get(routes::teams::list_members),
        )
        .route(
            "/teams/{team_id}/members/{member_id}",
            delete(routes::teams::remove_member),
        )
        .route(
            "/teams/{team_id}/invite",
            post(routes::teams::invite_members),
        )
        // Invites
        .route("/invites/accept", post(routes::teams::accept_invite))
        // Dashboard
        .route("/dashboard", get(routes::dashboard::dashboard));

    let cors = match &config.frontend_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    // The sweep shares the state and shuts down with the server.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweep_task = tokio::spawn(sweep::run_sweep(state, shutdown_rx));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    shutdown_tx.send(true).ok();
    sweep_task.await.ok();

    Ok(())
}
