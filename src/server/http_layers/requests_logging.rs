//! Request logging middleware

use super::super::state::ServerState;
use axum::extract::State;
use axum::{
    body::Body,
    http::{header::HeaderMap, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use std::time::Instant;
use tracing::{error, info};

#[derive(PartialEq, PartialOrd, Clone, Debug, clap::ValueEnum)]
pub enum RequestsLoggingLevel {
    None,
    Path,
    Headers,
    Body,
}

impl Default for RequestsLoggingLevel {
    fn default() -> Self {
        Self::Path
    }
}

impl std::fmt::Display for RequestsLoggingLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

const MAX_LOGGABLE_BODY_LENGTH: usize = 1024;

enum ContentLengthParseResult {
    Ok(usize),
    No(&'static str),
}

fn parse_content_length(headers: &HeaderMap) -> ContentLengthParseResult {
    let Some(value) = headers.get("content-length") else {
        return ContentLengthParseResult::No("Content-length not set.");
    };

    let Ok(str_value) = value.to_str() else {
        return ContentLengthParseResult::No("Could not get Content-length string value.");
    };

    match str_value.parse::<usize>() {
        Ok(x) => ContentLengthParseResult::Ok(x),
        Err(_) => ContentLengthParseResult::No("Could not parse Content-length numeric value."),
    }
}

fn internal_error() -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

fn log_headers(label: &str, headers: &HeaderMap) {
    info!("  {} Headers:", label);
    for (name, value) in headers.iter() {
        info!("    {:?}: {:?}", name, value);
    }
}

/// Logs a small body and hands back an equivalent one, since reading consumes it.
async fn log_body(label: &str, headers: &HeaderMap, body: Body) -> Result<Body, axum::Error> {
    match parse_content_length(headers) {
        ContentLengthParseResult::No(reason) => {
            info!("  {} Body: {}", label, reason);
            Ok(body)
        }
        ContentLengthParseResult::Ok(size) if size < MAX_LOGGABLE_BODY_LENGTH => {
            let bytes = axum::body::to_bytes(body, size).await?;
            info!("  {} Body:\n{}", label, String::from_utf8_lossy(&bytes));
            Ok(Body::from(bytes))
        }
        ContentLengthParseResult::Ok(size) => {
            info!("  {} Body: Too big to log ({} bytes)", label, size);
            Ok(body)
        }
    }
}

pub async fn log_requests(
    State(state): State<ServerState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let level = state.config.requests_logging_level.clone();
    if level == RequestsLoggingLevel::None {
        return next.run(request).await;
    }

    let start = Instant::now();
    info!(">>> {} {}", request.method(), request.uri());

    let (parts, body) = request.into_parts();
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Req", &parts.headers);
    }
    let body = if level >= RequestsLoggingLevel::Body {
        match log_body("Req", &parts.headers, body).await {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to read request body: {:?}", err);
                return internal_error();
            }
        }
    } else {
        body
    };

    let response = next.run(Request::from_parts(parts, body)).await;

    let (parts, body) = response.into_parts();
    if level >= RequestsLoggingLevel::Headers {
        log_headers("Resp", &parts.headers);
    }
    let body = if level >= RequestsLoggingLevel::Body {
        match log_body("Resp", &parts.headers, body).await {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to read response body: {:?}", err);
                return internal_error();
            }
        }
    } else {
        body
    };

    info!(
        "<<< {} ({}ms)",
        parts.status.as_u16(),
        start.elapsed().as_millis()
    );
    Response::from_parts(parts, body)
}
