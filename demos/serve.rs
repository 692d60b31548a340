use std::io;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use axum_stream_sender::{SenderConfig, StreamResponse, StreamResponseSender};

/// Sender options as JSON, e.g. `{"enable_speed_limit": true, "chunk_size": 1024}`.
const CONFIG_VAR: &str = "STREAM_SENDER_CONFIG";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let config = match std::env::var(CONFIG_VAR) {
        Ok(json) => serde_json::from_str(&json).expect("invalid sender config"),
        Err(_) => SenderConfig::default().with_range_support(true),
    };
    let sender = StreamResponseSender::new(config).expect("invalid sender config");
    tracing::info!(?config, "serving on 127.0.0.1:3000");

    let router = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/file", get(get_file))
        .with_state(sender);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
    axum::serve(listener, router).await.unwrap();
}

#[derive(Debug, Deserialize)]
struct FileRequest {
    path: String,
}

/// Serves `?path=` relative to the working directory, or any absolute path.
///
/// Every file the process can read is reachable, so run this demo locally
/// only and never expose it on a shared network.
async fn get_file(
    State(sender): State<StreamResponseSender>,
    headers: HeaderMap,
    Query(q): Query<FileRequest>,
) -> Response {
    match StreamResponse::open(&q.path).await {
        Ok(response) => sender.respond(&headers, response),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}
