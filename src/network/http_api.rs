use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::DashboardConfig;
use crate::dataset::generator::DatasetGenerator;
use crate::dataset::{SortDirection, SortField};
use crate::error::MetricsError;

/// Method, path and query string of an incoming request.
#[derive(Debug, PartialEq)]
struct HttpRequest {
    method: String,
    path: String,
    query: HashMap<String, String>,
}

fn parse_request(raw: &str) -> Option<HttpRequest> {
    let line = raw.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?;

    let (path, query_str) = match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    };
    let query = query_str
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();

    Some(HttpRequest {
        method,
        path: path.to_string(),
        query,
    })
}

/// Status code and JSON body for a request. CORS preflight has no body.
fn route(config: &DashboardConfig, request: &HttpRequest) -> (u16, Option<serde_json::Value>) {
    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => (204, None),
        ("GET", "/health") => (200, Some(json!({ "status": "ok" }))),
        ("GET", "/snapshot") => match snapshot(config, &request.query) {
            Ok(body) => (200, Some(body)),
            Err(e) => (400, Some(json!({ "error": e.to_string(), "code": e.code() }))),
        },
        _ => (404, Some(json!({ "error": "not found" }))),
    }
}

fn snapshot(
    config: &DashboardConfig,
    query: &HashMap<String, String>,
) -> Result<serde_json::Value, MetricsError> {
    let field = match query.get("sort") {
        Some(name) => name.parse()?,
        None => SortField::default(),
    };
    let direction = match query.get("order").map(String::as_str) {
        None => SortDirection::default(),
        Some("asc") => SortDirection::Ascending,
        Some("desc") => SortDirection::Descending,
        Some(other) => return Err(invalid("order", other)),
    };
    let rng = match query.get("seed") {
        Some(raw) => StdRng::seed_from_u64(raw.parse().map_err(|_| invalid("seed", raw))?),
        None => StdRng::from_entropy(),
    };

    let table = DatasetGenerator::new(config.clone(), rng)?.generate()?;
    let summary = table.summary();
    Ok(json!({
        "title": config.title,
        "metric": config.metric,
        "periods": config.periods,
        "sort_field": field,
        "sort_direction": direction,
        "baseline_progress": summary.baseline_progress(),
        "followup_progress": summary.followup_progress(),
        "summary": summary,
        "records": table.sorted(field, direction),
    }))
}

fn invalid(name: &str, value: &str) -> MetricsError {
    MetricsError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    }
}

/// Lightweight HTTP API for one-shot snapshots, separate from the
/// WebSocket server.
pub async fn start(addr: SocketAddr, config: Arc<DashboardConfig>) {
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind HTTP API on {}: {}", addr, e);
            return;
        }
    };

    info!("HTTP API listening on http://{}", addr);

    loop {
        let (mut stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("HTTP API accept error: {}", e);
                continue;
            }
        };

        let config = config.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            let n = match stream.read(&mut buf).await {
                Ok(n) => n,
                Err(_) => return,
            };
            let raw = String::from_utf8_lossy(&buf[..n]);

            let (status, body) = match parse_request(&raw) {
                Some(request) => {
                    debug!("HTTP {} {}", request.method, request.path);
                    route(&config, &request)
                }
                None => (400, Some(json!({ "error": "malformed request" }))),
            };

            let response = match body {
                None => format!(
                    "HTTP/1.1 {} {}\r\n\
                    Access-Control-Allow-Origin: *\r\n\
                    Access-Control-Allow-Methods: GET, OPTIONS\r\n\
                    Access-Control-Allow-Headers: Content-Type\r\n\
                    \r\n",
                    status,
                    status_text(status),
                ),
                Some(body) => {
                    let body = body.to_string();
                    format!(
                        "HTTP/1.1 {} {}\r\n\
                        Content-Type: application/json\r\n\
                        Access-Control-Allow-Origin: *\r\n\
                        Content-Length: {}\r\n\
                        \r\n\
                        {}",
                        status,
                        status_text(status),
                        body.len(),
                        body,
                    )
                }
            };
            let _ = stream.write_all(response.as_bytes()).await;
        });
    }
}
