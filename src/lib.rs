//! Coverage Export
//!
//! Typed export requests for wireless-coverage visualizations (2D heatmaps and
//! 3D volumes), their cross-field validation, reproducibility fingerprints and
//! a client for submitting exports to the rendering service.

pub mod activity;
pub mod canonical;
pub mod client;
pub mod config;
pub mod error;
pub mod hasher;
pub mod health;
pub mod session;
pub mod types;
pub mod validation;

// Re-export core types
pub use activity::{ActivityEntry, ActivityLevel, ActivityLog};
pub use canonical::{encode, encode_serializable};
pub use client::{
    normalize_error, with_sidecars, ExportClient, HttpMethod, HttpTransport, Transport,
    TransportRequest, TransportResponse,
};
pub use config::ServiceConfig;
pub use error::{
    ConfigError, CoverageError, MalformedResponseError, SerializationError, TransportError,
    ValidationError,
};
pub use hasher::{config_hash, ConfigHasher};
pub use health::{check_status, HealthMonitor, HealthMonitorHandle, HealthStatus};
pub use session::{ExportSession, ExportSessionBuilder};
pub use types::{
    describe_units, ApSelection, ApSelectionType, ColorMap, ConfigHash, DataRefs, Downsampling,
    EnrichedRequest, ExportKind, ExportMetrics, ExportRequest, ExportResult, Mode, MultiApMode,
    Overlays, PerformanceSidecar, ReproducibilitySidecar, Thresholds, Units,
};
pub use validation::{validate, validate_messages, Validator, Violation, ViolationCode};
