use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unpack::config::Config;
use unpack::notify::{DiscordWebhook, Notifier};
use unpack::pack::{self, repository::PostgresPackRepository};
use unpack::provider::{OsuClient, ScoreProvider};
use unpack::score::repository::PostgresScoreRepository;
use unpack::shared::AppState;
use unpack::tracker::{RetryPolicy, Tracker, TrackerConfig};
use unpack::user::{self, repository::PostgresUserRepository};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unpack=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting unpack score tracker");

    // Configuration errors are fatal: never start polling half-configured
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration, refusing to start");
            std::process::exit(1);
        }
    };

    let pool = match sqlx::PgPool::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        }
    };

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let pack_repository = Arc::new(PostgresPackRepository::new(pool.clone()));
    let score_repository = Arc::new(PostgresScoreRepository::new(pool));
    let provider: Arc<dyn ScoreProvider> = Arc::new(OsuClient::new(
        config.client_id.clone(),
        config.client_secret.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(DiscordWebhook::new(config.webhook_url.clone()));

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.cancel();
            }
        });
    }

    // Background score tracker; a failure of the scheduler itself is fatal
    let tracker = Tracker::new(
        user_repository.clone(),
        pack_repository.clone(),
        score_repository.clone(),
        provider.clone(),
        notifier,
        TrackerConfig {
            pack_id: config.pack_id,
            window: pack::models::PackWindow::new(config.pack_start, config.pack_end),
            poll_interval: config.poll_interval,
            user_delay: config.user_delay,
            fetch_limit: config.fetch_limit,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                ..RetryPolicy::default()
            },
        },
    );
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tracker.run(shutdown).await {
                error!(error = %e, "Score tracker failed");
                std::process::exit(1);
            }
        });
    }

    let app_state = AppState::new(
        user_repository,
        pack_repository,
        score_repository,
        provider,
    );

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/register", post(user::handlers::register_user))
        .route("/leaderboard/:pack_id", get(user::handlers::leaderboard))
        .route("/packs/:pack_id/maps", put(pack::handlers::import_pack))
        .route("/packs/:pack_id", delete(pack::handlers::remove_pack))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, bind_addr = %config.bind_addr, "Failed to bind");
            std::process::exit(1);
        }
    };
    info!(bind_addr = %config.bind_addr, "HTTP API listening");

    let serve_shutdown = shutdown.clone();
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_shutdown.cancelled().await })
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Shut down cleanly");
}
