use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::Method;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use scamshield::reddit::poller::run_reddit_poller;
use scamshield::routes;
use scamshield::state::AppState;
use scamshield::trends::poller::run_trends_poller;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Initializing state...");
    let state = Arc::new(AppState::new());
    let config = state.config_snapshot();

    // Background integrations; each gates itself on config every cycle.
    tokio::spawn(run_reddit_poller(state.clone()));
    tokio::spawn(run_trends_poller(state.clone()));

    let mut app = routes::api_router().with_state(state.clone());

    if let Some(origin) = &config.server.cors_origin {
        match origin.parse::<axum::http::HeaderValue>() {
            Ok(origin) => {
                let cors = CorsLayer::new()
                    .allow_origin(origin)
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PATCH,
                        Method::PUT,
                        Method::OPTIONS,
                    ])
                    .allow_headers([CONTENT_TYPE])
                    .allow_credentials(true)
                    .max_age(Duration::from_secs(60 * 60));
                app = app.layer(cors);
            }
            Err(e) => log::warn!("Ignoring invalid corsOrigin '{}': {}", origin, e),
        }
    }

    let address = format!("0.0.0.0:{}", config.server.port);
    log::info!("Binding to {address}");

    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {address}: {e}");
            std::process::exit(1);
        }
    };
    log::info!("Server running on {address}");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        log::error!("Server error: {e}");
        std::process::exit(1);
    }

    log::info!("Server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        log::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        log::info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
