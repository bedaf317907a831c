#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use coverage_export::{
    ApSelection, ExportClient, ExportRequest, ServiceConfig, Transport, TransportError,
    TransportRequest, TransportResponse,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const BASE_URL: &str = "http://coverage.test";

type Scripted = Result<TransportResponse, TransportError>;

/// Transport that replays scripted responses and records every request
#[derive(Clone, Default)]
pub struct StubTransport {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Arc<Mutex<Option<Scripted>>>,
    requests: Arc<Mutex<Vec<TransportRequest>>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse::new(status, body)));
        self
    }

    /// Queue one network failure
    pub fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(TransportError::network(message)));
        self
    }

    /// Response used once the queue is empty
    pub fn always(self, status: u16, body: impl Into<String>) -> Self {
        *self.fallback.lock().unwrap() = Some(Ok(TransportResponse::new(status, body)));
        self
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for StubTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        let next = next.unwrap_or_else(|| {
            self.fallback
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(TransportError::network("no scripted response")))
        });
        async move { next }
    }
}

pub fn stub_client(transport: StubTransport) -> ExportClient<StubTransport> {
    ExportClient::with_transport(ServiceConfig::new(BASE_URL).unwrap(), transport)
}

/// The fully valid 2D request used across scenarios
pub fn valid_2d_request() -> ExportRequest {
    ExportRequest {
        seed: 42,
        color_range: [-90.0, -30.0],
        ap_selection: ApSelection::single("ap-1"),
        ..ExportRequest::default()
    }
}

pub fn valid_2d_json() -> Value {
    json!({
        "mode": "2d",
        "z_slice": 0,
        "color_map": "Viridis",
        "color_range": [-90, -30],
        "thresholds": {"min": -85, "max": -45},
        "ap_selection": {"type": "single", "ap_ids": ["ap-1"]},
        "overlays": {"kriging_variance": false},
        "seed": 42,
        "crs": "EPSG:3857",
        "units": {"freq": "MHz", "distance": "m", "power": "dBm", "gain": "dBi"},
        "data_refs": {"grid_ids": ["grid-1"], "mask_ids": []},
        "downsampling": {"factor": 0}
    })
}

pub fn png_success_body() -> String {
    json!({
        "artifact_id": "x",
        "png_path": "/p",
        "json_sidecar_path": "/s",
        "metrics": {"render_ms": 12}
    })
    .to_string()
}

/// Accept one HTTP connection, answer it, and hand back the raw request text
pub async fn serve_once(status_line: &'static str, body: String) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let raw = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
        raw
    });

    (format!("http://{}", addr), handle)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Split a raw HTTP request into lower-cased head and body
pub fn split_raw_request(raw: &str) -> (String, String) {
    match raw.split_once("\r\n\r\n") {
        Some((head, body)) => (head.to_lowercase(), body.to_string()),
        None => (raw.to_lowercase(), String::new()),
    }
}
