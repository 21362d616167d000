use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Request, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::users;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Smart Dating Optimizer API is running",
    }))
}

/// Spans are keyed by the matched route so `/users/7` and `/users/8` group together.
fn request_span(req: &Request<Body>) -> Span {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| req.uri().path());
    tracing::info_span!(
        "request",
        method = %req.method(),
        route,
        status = tracing::field::Empty,
    )
}

fn log_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    let latency_ms = latency.as_millis() as u64;
    match status.as_u16() {
        500.. => tracing::error!(%status, latency_ms, "request failed"),
        400..=499 => tracing::warn!(%status, latency_ms, "request rejected"),
        _ => tracing::info!(%status, latency_ms, "request served"),
    }
}

fn cors(config: &AppConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors(&state.config);
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(users::router())
                .route("/health", get(health)),
        )
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(log_response),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::to_bytes, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_served_at_root_and_under_api() {
        let app = build_app(AppState::in_memory(AppConfig::for_tests()));
        for uri in ["/health", "/api/v1/health"] {
            let resp = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["status"], "ok");
        }
    }

    #[tokio::test]
    async fn unmatched_route_is_logged_and_answered_with_404() {
        let app = build_app(AppState::in_memory(AppConfig::for_tests()));
        let resp = app
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let span = request_span(&Request::builder().uri("/users/7").body(Body::empty()).unwrap());
        log_response(
            &Response::builder().status(503).body(Body::empty()).unwrap(),
            Duration::from_millis(3),
            &span,
        );
    }

    #[tokio::test]
    async fn restricted_cors_echoes_only_listed_origins() {
        let mut config = AppConfig::for_tests();
        config.cors_allowed_origins = vec!["http://localhost:3000".into()];
        let app = build_app(AppState::in_memory(config));

        let allowed = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://localhost:3000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );

        let denied = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(denied.headers().get("access-control-allow-origin").is_none());
    }
}
