//! HTTP Server for the KPI dashboard
//! Simple HTTP server using tokio and basic HTTP handling

use anyhow::Context;
use serde_json::json;
use shopping_kpi::config::AppConfig;
use shopping_kpi::{load_engine, Kpi, KpiError, MetricsEngine};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    info!("Starting KPI API server...");

    // Load once; every connection shares the same immutable dataset.
    let data_path = config.data_path.clone();
    let engine = tokio::task::spawn_blocking(move || load_engine(&data_path))
        .await?
        .with_context(|| format!("Failed to load {}", config.data_path.display()))?;
    info!("Loaded {} normalized records", engine.dataset().len());
    let engine = Arc::new(engine);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("Server listening on {}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&engine)));
    }
}

async fn handle_connection(mut stream: TcpStream, engine: Arc<MetricsEngine>) {
    use tokio::time::{timeout, Duration};

    // Read request with timeout to prevent hanging
    let mut buffer = Vec::new();
    let mut temp_buf = [0; 8192];

    let read_result = timeout(Duration::from_secs(5), async {
        loop {
            match stream.read(&mut temp_buf).await {
                Ok(0) => break,
                Ok(n) => {
                    buffer.extend_from_slice(&temp_buf[..n]);
                    // GET/OPTIONS only, so the request ends with the headers
                    if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                    if buffer.len() > 64 * 1024 {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read from stream: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(())
    })
    .await;

    match read_result {
        Ok(Ok(())) => {}
        Ok(Err(_)) => return,
        Err(_) => {
            warn!("Request read timeout");
            return;
        }
    }

    if buffer.is_empty() {
        return;
    }

    let response = match String::from_utf8(buffer) {
        Ok(request) => handle_request(&request, &engine),
        Err(_) => create_response(400, "Bad Request", r#"{"error":"request is not UTF-8"}"#),
    };
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed to write response: {}", e);
    }
}

fn handle_request(request: &str, engine: &MetricsEngine) -> String {
    let Some(request_line) = request.lines().next() else {
        return create_response(400, "Bad Request", "{}");
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        return create_response(400, "Bad Request", "{}");
    }

    let method = parts[0];
    let path = parts[1].split('?').next().unwrap_or_default();

    // Normalize path (remove trailing slash except for root)
    let path = match path.trim_end_matches('/') {
        "" => "/",
        p => p,
    };

    debug!("Request: {} {}", method, path);

    match (method, path) {
        ("OPTIONS", _) => create_response(204, "No Content", ""),
        ("GET", "/kpi") => {
            let names: Vec<&str> = Kpi::ALL.iter().map(|k| k.name()).collect();
            json_response(200, "OK", &json!({ "kpis": names }))
        }
        ("GET", p) if p.starts_with("/kpi/") => {
            let name = &p["/kpi/".len()..];
            kpi_response(engine, name)
        }
        ("GET", _) => json_response(404, "Not Found", &json!({ "error": "not found" })),
        _ => json_response(405, "Method Not Allowed", &json!({ "error": "method not allowed" })),
    }
}

fn kpi_response(engine: &MetricsEngine, name: &str) -> String {
    let result = name.parse::<Kpi>().and_then(|kpi| engine.compute(kpi).map(|r| (kpi, r)));
    match result {
        Ok((kpi, value)) => json_response(200, "OK", &json!({ (kpi.name()): value })),
        Err(e @ KpiError::UnknownKpi(_)) => {
            json_response(404, "Not Found", &json!({ "error": e.to_string() }))
        }
        Err(e @ KpiError::EmptyDataset(_)) => {
            json_response(422, "Unprocessable Entity", &json!({ "error": e.to_string() }))
        }
        Err(e) => {
            error!("KPI {} failed: {}", name, e);
            json_response(500, "Internal Server Error", &json!({ "error": e.to_string() }))
        }
    }
}

fn json_response(status: u16, status_text: &str, body: &serde_json::Value) -> String {
    create_response(status, status_text, &body.to_string())
}

fn create_response(status: u16, status_text: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        body.len(),
        body
    )
}
