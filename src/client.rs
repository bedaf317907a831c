//! Export client for the rendering service
//!
//! Each call is independent: no caching, no retries, no deduplication of
//! concurrent submissions. Requests are validated locally first and never
//! leave the process when they have violations.

use std::future::Future;
use std::time::Instant;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};
use crate::config::{ServiceConfig, HEALTH_PATH};
use crate::error::{
    ConfigError, CoverageError, MalformedResponseError, SerializationError, TransportError,
    ValidationError, UNKNOWN_ERROR_CODE,
};
use crate::hasher::ConfigHasher;
use crate::types::{
    EnrichedRequest, ExportKind, ExportRequest, ExportResult, PerformanceSidecar,
    ReproducibilitySidecar,
};
use crate::validation::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request handed to a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl TransportRequest {
    /// Value of the first header with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and raw body of a service response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The network boundary. Implementations perform one HTTP exchange per call.
pub trait Transport: Send + Sync {
    /// Perform the request. Any received status, including errors, is `Ok`;
    /// `Err` means no response was obtained.
    fn execute(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient {
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Use a preconfigured `reqwest` client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        async move {
            let mut builder = match request.method {
                HttpMethod::Get => self.client.get(&request.url),
                HttpMethod::Post => self.client.post(&request.url),
            };
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::network(e.to_string()))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| {
                TransportError::new(status, "BODY_READ_FAILED", e.to_string())
            })?;

            Ok(TransportResponse { status, body })
        }
    }
}

/// Attach the reproducibility and performance sidecars to a request.
///
/// The fingerprint covers the request alone. When `perf` has no
/// `downsampling_factor`, the request's own factor is used.
///
/// # Errors
/// Returns an error when the request cannot be serialized for hashing.
pub fn with_sidecars(
    request: &ExportRequest,
    perf: Option<&PerformanceSidecar>,
) -> Result<EnrichedRequest, SerializationError> {
    let config_hash = ConfigHasher::new().hash(request)?;
    let mut performance = perf.copied().unwrap_or_default();
    if performance.downsampling_factor.is_none() {
        performance.downsampling_factor = Some(request.downsampling.factor);
    }

    Ok(EnrichedRequest {
        request: request.clone(),
        reproducibility: ReproducibilitySidecar {
            seed: request.seed,
            config_hash,
        },
        performance,
    })
}

/// Turn a non-2xx response into `{status, code, message}`.
///
/// Uses `error.code` and `error.message` from a JSON body when present and
/// non-empty, otherwise `UNKNOWN` and a message naming the status.
pub fn normalize_error(kind: ExportKind, status: u16, body: &str) -> TransportError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));
    let field = |name: &str| {
        error
            .and_then(|e| e.get(name))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let code = field("code").unwrap_or_else(|| UNKNOWN_ERROR_CODE.to_string());
    let message = field("message")
        .unwrap_or_else(|| format!("Export {} failed with status {}", kind.label(), status));
    TransportError::new(status, code, message)
}

fn parse_result(kind: ExportKind, response: &TransportResponse) -> Result<ExportResult, MalformedResponseError> {
    let malformed = |reason: String| MalformedResponseError {
        status: response.status,
        reason,
    };
    let result: ExportResult =
        serde_json::from_str(&response.body).map_err(|e| malformed(e.to_string()))?;
    if result.artifact_path(kind).is_none() {
        return Err(malformed(format!("missing field `{}`", kind.artifact_field())));
    }
    Ok(result)
}

/// Client for the export and health endpoints
#[derive(Debug, Clone)]
pub struct ExportClient<T = HttpTransport> {
    config: ServiceConfig,
    transport: T,
    validator: Validator,
}

impl ExportClient<HttpTransport> {
    /// Client using the `reqwest` transport
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self, CoverageError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ExportClient<T> {
    pub fn with_transport(config: ServiceConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            validator: Validator::new(),
        }
    }

    /// Replace the validator used to gate submissions
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Probe `GET /api/v1/healthz`
    ///
    /// # Errors
    /// Returns an error when the service could not be reached.
    pub async fn probe_health(&self) -> Result<TransportResponse, TransportError> {
        let request = TransportRequest {
            method: HttpMethod::Get,
            url: self.config.endpoint(HEALTH_PATH),
            headers: self.config.headers(),
            body: None,
        };
        self.transport.execute(request).await
    }

    /// `true` when the service answered the health probe with a 2xx status
    pub async fn check_health(&self) -> bool {
        match self.probe_health().await {
            Ok(response) => response.is_success(),
            Err(err) => {
                debug!(error = %err, "health probe failed");
                false
            }
        }
    }

    /// Validate, enrich and submit an export.
    ///
    /// On success the returned result carries the measured round trip in
    /// `client_timing_ms`.
    ///
    /// # Errors
    /// - `Validation` when the request has violations (nothing is sent)
    /// - `Transport` on network failure or a non-2xx status
    /// - `MalformedResponse` when a 2xx body is not a usable result
    pub async fn submit_export(
        &self,
        kind: ExportKind,
        request: &ExportRequest,
        perf: Option<&PerformanceSidecar>,
    ) -> Result<ExportResult, CoverageError> {
        let violations = self.validator.validate_request(request);
        if !violations.is_empty() {
            warn!(kind = %kind, violations = violations.len(), "export blocked by validation");
            return Err(ValidationError::new(violations).into());
        }

        let enriched = with_sidecars(request, perf)?;
        let config_hash = enriched.reproducibility.config_hash;
        let body = serde_json::to_string(&enriched).map_err(SerializationError::from)?;
        let transport_request = TransportRequest {
            method: HttpMethod::Post,
            url: self.config.endpoint(kind.endpoint_path()),
            headers: self.config.headers(),
            body: Some(body),
        };

        debug!(
            kind = %kind,
            config_hash = %config_hash,
            url = %transport_request.url,
            has_api_key = self.config.api_key().is_some(),
            "submitting export"
        );

        let started = Instant::now();
        let outcome = self.transport.execute(transport_request).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let response = outcome.map_err(|err| {
            warn!(kind = %kind, config_hash = %config_hash, error = %err, "export request failed");
            err
        })?;

        if !response.is_success() {
            let err = normalize_error(kind, response.status, &response.body);
            warn!(
                kind = %kind,
                config_hash = %config_hash,
                status = err.status,
                code = %err.code,
                elapsed_ms,
                "export rejected"
            );
            return Err(err.into());
        }

        let mut result = parse_result(kind, &response)?;
        result.client_timing_ms = elapsed_ms;

        info!(
            kind = %kind,
            config_hash = %config_hash,
            artifact_id = %result.artifact_id,
            elapsed_ms,
            "export completed"
        );
        Ok(result)
    }

    pub async fn export_png(
        &self,
        request: &ExportRequest,
        perf: Option<&PerformanceSidecar>,
    ) -> Result<ExportResult, CoverageError> {
        self.submit_export(ExportKind::Png, request, perf).await
    }

    pub async fn export_html(
        &self,
        request: &ExportRequest,
        perf: Option<&PerformanceSidecar>,
    ) -> Result<ExportResult, CoverageError> {
        self.submit_export(ExportKind::Html, request, perf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfigHash;

    #[test]
    fn test_with_sidecars_does_not_mutate_request() {
        let request = ExportRequest::default();
        let before = request.clone();
        let enriched = with_sidecars(&request, None).unwrap();
        assert_eq!(request, before);
        assert_eq!(enriched.request, before);
        assert_eq!(enriched.reproducibility.seed, 42);
        assert_eq!(
            enriched.reproducibility.config_hash,
            "56d10428".parse::<ConfigHash>().unwrap()
        );
    }

    #[test]
    fn test_with_sidecars_defaults_downsampling_factor() {
        let mut request = ExportRequest::default();
        request.downsampling.factor = 2.0;

        let enriched = with_sidecars(&request, Some(&PerformanceSidecar::with_render_ms(8.0))).unwrap();
        assert_eq!(enriched.performance.render_ms, Some(8.0));
        assert_eq!(enriched.performance.downsampling_factor, Some(2.0));

        let explicit = PerformanceSidecar {
            downsampling_factor: Some(4.0),
            ..PerformanceSidecar::default()
        };
        let enriched = with_sidecars(&request, Some(&explicit)).unwrap();
        assert_eq!(enriched.performance.downsampling_factor, Some(4.0));
    }

    #[test]
    fn test_normalize_error_uses_body() {
        let err = normalize_error(
            ExportKind::Png,
            400,
            r#"{"error":{"code":"BAD_REQUEST","message":"m"}}"#,
        );
        assert_eq!(err, TransportError::new(400, "BAD_REQUEST", "m"));
    }

    #[test]
    fn test_normalize_error_falls_back() {
        let err = normalize_error(ExportKind::Html, 500, "<html>oops</html>");
        assert_eq!(err.code, "UNKNOWN");
        assert_eq!(err.message, "Export HTML failed with status 500");

        let err = normalize_error(ExportKind::Png, 502, r#"{"error":{"code":"UPSTREAM"}}"#);
        assert_eq!(err.to_string(), "[502/UPSTREAM] Export PNG failed with status 502");
    }

    #[test]
    fn test_parse_result_requires_artifact_path() {
        let response = TransportResponse::new(
            200,
            r#"{"artifact_id":"x","png_path":"/p","json_sidecar_path":"/s"}"#,
        );
        assert!(parse_result(ExportKind::Png, &response).is_ok());
        let err = parse_result(ExportKind::Html, &response).unwrap_err();
        assert!(err.reason.contains("html_path"));
    }

    #[test]
    fn test_parse_result_rejects_non_json() {
        let response = TransportResponse::new(200, "not json");
        let err = parse_result(ExportKind::Png, &response).unwrap_err();
        assert_eq!(err.status, 200);
    }

    #[test]
    fn test_request_header_lookup_ignores_case() {
        let request = TransportRequest {
            method: HttpMethod::Get,
            url: "http://svc/api/v1/healthz".to_string(),
            headers: vec![("X-API-Key".to_string(), "k".to_string())],
            body: None,
        };
        assert_eq!(request.header("x-api-key"), Some("k"));
        assert_eq!(request.header("content-type"), None);
    }
}
