// src/server.rs

//! HTTP engine setup and serving.
//!
//! Every registered route is wrapped with:
//! - a JSON 404 fallback for unmatched paths
//! - panic recovery turning a crashed handler into a JSON 500
//! - one `info` log line per request (status, latency, client IP, method, path)

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use std::{any::Any, net::SocketAddr, time::Duration};
use tokio::net::TcpListener;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::Span;
use uuid::Uuid;

use crate::config::TlsConfig;

/// Wrap the registered routes with the fallback and middleware.
pub fn app(routes: Router) -> Router {
    routes
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request<Body>| {
                    let client_ip = req
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string())
                        .unwrap_or_else(|| "-".to_string());

                    tracing::info_span!(
                        "api_request",
                        request_id = %Uuid::new_v4(),
                        method = %req.method(),
                        path = %req.uri().path(),
                        client_ip = %client_ip,
                    )
                })
                .on_response(|res: &Response, latency: Duration, _span: &Span| {
                    tracing::info!(
                        status_code = res.status().as_u16(),
                        latency_ms = latency.as_millis(),
                        "api request"
                    );
                }),
        )
}

/* ---------------- serving ---------------- */

pub async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("api server listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("api server stopped")?;
    Ok(())
}

pub async fn serve_tls(app: Router, addr: SocketAddr, tls: &TlsConfig) -> Result<()> {
    let config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .with_context(|| {
            format!(
                "Failed to load TLS certificate {:?} / key {:?}",
                tls.cert, tls.key
            )
        })?;

    tracing::info!("api tls server listening on https://{}", addr);

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("api tls server stopped")?;
    Ok(())
}

/* ---------------- fallbacks ---------------- */

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "code": 0,
            "message": "Page not found",
        })),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = detail, "handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "code": 1,
            "msg": "internal server error",
        })),
    )
        .into_response()
}
