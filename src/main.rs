use std::sync::Arc;

use anyhow::Context;
use axum::{http::HeaderValue, middleware, Router};
use tokio::sync::mpsc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use storefront_account_api::auth::SessionService;
use storefront_account_api::config::{init_tracing, load_config};
use storefront_account_api::db::{establish_connection_from_app_config, run_migrations};
use storefront_account_api::events::{process_events, EventSender};
use storefront_account_api::handlers::AppServices;
use storefront_account_api::mailer::mailer_from_config;
use storefront_account_api::middleware_helpers::request_id_middleware;
use storefront_account_api::observability::configure_http_tracing;
use storefront_account_api::services::{
    AccountService, AddressService, OrderHistoryService, PasswordResetService,
};
use storefront_account_api::{api_v1_routes, openapi, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(&config.log_level, config.log_json);

    info!(
        environment = %config.environment,
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let db = Arc::new(
        establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?,
    );

    if config.auto_migrate {
        run_migrations(&db).await.context("migrations failed")?;
    }

    let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity);
    let event_sender = Arc::new(EventSender::new(event_tx));
    let event_task = tokio::spawn(process_events(event_rx));

    let mailer = mailer_from_config(&config).context("failed to build mailer")?;
    let sessions = SessionService::from_config(&config);

    let services = AppServices {
        accounts: AccountService::new(db.clone(), Some(event_sender.clone())),
        addresses: AddressService::new(db.clone(), Some(event_sender.clone())),
        orders: OrderHistoryService::new(db.clone()),
        password_resets: PasswordResetService::new(
            db.clone(),
            mailer,
            Some(event_sender.clone()),
            config.app_base_url.clone(),
            config.reset_token_ttl_secs,
        ),
    };

    let cors_layer = build_cors_layer(&config)?;

    let config = Arc::new(config);
    let app_state = AppState {
        db,
        config: config.clone(),
        event_sender,
        sessions,
        services,
    };

    let app = Router::new()
        .route("/", axum::routing::get(|| async { env!("CARGO_PKG_NAME") }))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(app_state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {addr}");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    event_task.abort();
    info!("Shutdown complete");
    Ok(())
}

fn build_cors_layer(
    config: &storefront_account_api::config::AppConfig,
) -> anyhow::Result<CorsLayer> {
    match config.configured_origins() {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        error!("Invalid CORS origin: {origin}");
                        None
                    }
                })
                .collect();
            if parsed.is_empty() {
                anyhow::bail!("no valid CORS origins configured");
            }
            Ok(CorsLayer::new()
                .allow_origin(AllowOrigin::list(parsed))
                .allow_methods(Any)
                .allow_headers(Any))
        }
        None if config.is_development() => {
            warn!("CORS origins not configured; using permissive policy for development");
            Ok(CorsLayer::permissive())
        }
        None => anyhow::bail!("cors_allowed_origins must be set outside development"),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
