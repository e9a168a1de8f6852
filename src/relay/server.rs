//! Axum server setup and startup

use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::{
    routes::{RelayState, create_router},
    types::ErrorBody,
};
use crate::config::ALLOWED_ORIGIN;

/// Largest accepted request body.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Router plus CORS, origin guard and body limit.
pub fn build_app(state: RelayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::exact(HeaderValue::from_static(ALLOWED_ORIGIN)))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    create_router(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(middleware::from_fn(reject_foreign_origin))
}

/// Requests without an `Origin` header (curl, the desktop client) pass.
async fn reject_foreign_origin(request: Request, next: Next) -> Response {
    let origin = request.headers().get(header::ORIGIN).cloned();
    log::debug!("CORS origin checked: {origin:?}");
    match origin {
        Some(origin) if origin != ALLOWED_ORIGIN => {
            log::warn!("rejected request from origin {origin:?}");
            (
                StatusCode::FORBIDDEN,
                Json(ErrorBody::new("Not allowed by CORS")),
            )
                .into_response()
        }
        _ => next.run(request).await,
    }
}

/// Serve until ctrl-c.
pub async fn run_server(port: u16, state: RelayState) -> Result<(), std::io::Error> {
    let app = build_app(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("relay listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("failed to listen for shutdown signal: {err}");
                std::future::pending::<()>().await;
            }
            log::info!("relay shutting down gracefully");
        })
        .await
}
