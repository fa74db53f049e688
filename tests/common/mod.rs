//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dynamic_config::config::ServiceConfig;
use dynamic_config::identity::{DisabledIssuer, HttpTokenIssuer, TokenIssuer};
use dynamic_config::notifications::StaticCoordinator;
use dynamic_config::store::MemoryStore;
use dynamic_config::{ConfigService, HttpServer};

pub const ADMIN_KEY: &str = "test-admin-key";
pub const SHARED_SECRET: &str = "test-shared-secret";

/// One request seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a mock backend on an ephemeral port. `respond` picks the status
/// and body for every request.
pub async fn start_recording_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let recorded = recorded.clone();
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        handle_connection(socket, recorded, respond).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

/// Mock backend that always answers with `status` and `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> MockBackend {
    start_recording_backend(move |_| (status, body.to_string())).await
}

/// Backend that accepts connections and reads requests but never answers.
pub async fn start_hanging_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let recorded = recorded.clone();
            tokio::spawn(async move {
                if let Some(request) = read_request(&mut socket).await {
                    recorded.lock().unwrap().push(request);
                }
                // Keep the socket open so the caller waits on us.
                std::future::pending::<()>().await;
                drop(socket);
            });
        }
    });

    MockBackend { addr, requests }
}

async fn handle_connection<F>(mut socket: TcpStream, recorded: Arc<Mutex<Vec<RecordedRequest>>>, respond: Arc<F>)
where
    F: Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let (status, body) = respond(&request);
    recorded.lock().unwrap().push(request);

    let status_text = match status {
        200 => "200 OK",
        201 => "201 Created",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    let body_end = buffer.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buffer[header_end..body_end]).to_string();

    Some(RecordedRequest { method, path, headers, body })
}

/// Configuration suited to tests: fast retries, known secrets.
pub fn test_config(environment: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.environment.name = environment.to_string();
    config.environment.deployment_id = environment.to_string();
    config.environment.shared_secret = SHARED_SECRET.to_string();
    config.admin.api_key = ADMIN_KEY.to_string();
    config.notifications.retry_base_delay_ms = 0;
    config.notifications.request_timeout_secs = 2;
    config.peers.timeout_secs = 2;
    config
}

/// Build a service over a fresh in-memory store.
pub async fn build_service(
    config: &ServiceConfig,
    store: Arc<MemoryStore>,
    primary: bool,
    instance_id: &str,
) -> Arc<ConfigService> {
    let issuer: Arc<dyn TokenIssuer> = if config.identity.enabled {
        Arc::new(HttpTokenIssuer::new(config.identity.clone(), config.environment.deployment_id.clone()).unwrap())
    } else {
        Arc::new(DisabledIssuer)
    };
    let coordinator = Arc::new(StaticCoordinator::new(instance_id, primary));
    Arc::new(ConfigService::build(config, store, issuer, coordinator).await.unwrap())
}

/// Serve `service` on an ephemeral port and return its base URL.
pub async fn spawn_server(config: &ServiceConfig, service: Arc<ConfigService>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, service);
    tokio::spawn(async move {
        let _ = server.run(listener, std::future::pending()).await;
    });
    format!("http://{}", addr)
}
