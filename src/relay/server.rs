//! Relay server wiring

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::any::Any;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::error::RelayError;
use super::handler::{health_handler, index_handler, not_found_handler, prompt_handler};
use crate::config::{AppConfig, RateLimitConfig};
use crate::provider::CompletionProvider;
use crate::sanitize::Sanitizer;

type PromptLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared state for the relay
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<dyn CompletionProvider>,
    pub sanitizer: Arc<Sanitizer>,
    limiter: Option<Arc<PromptLimiter>>,
}

impl RelayState {
    pub fn new(config: AppConfig, provider: Arc<dyn CompletionProvider>) -> Self {
        let sanitizer = Sanitizer::new(&config.limits);
        let limiter = build_rate_limiter(&config.rate_limit);
        Self {
            config: Arc::new(config),
            provider,
            sanitizer: Arc::new(sanitizer),
            limiter,
        }
    }
}

fn build_rate_limiter(config: &RateLimitConfig) -> Option<Arc<PromptLimiter>> {
    if !config.enabled {
        return None;
    }
    let per_minute = NonZeroU32::new(config.requests_per_minute)?;
    let burst = NonZeroU32::new(config.burst)?;
    Some(Arc::new(RateLimiter::direct(
        Quota::per_minute(per_minute).allow_burst(burst),
    )))
}

async fn rate_limit(State(state): State<RelayState>, req: Request, next: Next) -> Response {
    if let Some(ref limiter) = state.limiter {
        if limiter.check().is_err() {
            return RelayError::RateLimited.into_response();
        }
    }
    next.run(req).await
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Build the router with all routes and layers
pub fn build_router(state: RelayState) -> Router {
    let prompt = Router::new()
        .route("/prompt", post(prompt_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .merge(prompt)
        .fallback(not_found_handler)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::new().allow_origin(AnyOrigin).allow_methods(AnyOrigin).allow_headers(AnyOrigin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server
pub async fn run_server(
    config: AppConfig,
    provider: Arc<dyn CompletionProvider>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let provider_name = provider.name().to_string();
    let provider_url = config.provider.base_url().to_string();
    let rate_limit = config.rate_limit;

    let app = build_router(RelayState::new(config, provider));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("chat-relay listening on {}", addr);
    tracing::info!("Relaying to {} provider at {}", provider_name, provider_url);
    if rate_limit.enabled {
        tracing::info!(
            requests_per_minute = rate_limit.requests_per_minute,
            burst = rate_limit.burst,
            "Rate limiting /prompt"
        );
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chat-relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
