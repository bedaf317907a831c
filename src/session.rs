//! The owning context for one export configuration
//!
//! An [`ExportSession`] holds the current request snapshot together with its
//! validation state, the latest render metrics and the outcome of the last
//! export. Every edit re-validates the snapshot; exports are refused while
//! violations remain. Core functions receive the snapshot by reference, so no
//! process-wide state is involved.

use std::time::Instant;
use chrono::Utc;
use crate::activity::{ActivityEntry, ActivityLevel, ActivityLog};
use crate::canonical::format_f64;
use crate::client::{ExportClient, Transport};
use crate::error::{CoverageError, SerializationError, ValidationError};
use crate::hasher::ConfigHasher;
use crate::types::{
    describe_units, ApSelectionType, ConfigHash, ExportKind, ExportRequest, ExportResult, Mode,
    PerformanceSidecar,
};
use crate::validation::{Validator, Violation};

/// Split a comma-separated id list, trimming entries and dropping empties
pub fn parse_id_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Multi-line summary of a successful export
pub fn success_message(kind: ExportKind, result: &ExportResult, total_ms: u64) -> String {
    format!(
        "{} export success: artifact_id={}\n{}={}\njson_sidecar_path={}\nserver_render_ms={} client_ms={} ({} API)",
        kind.label(),
        result.artifact_id,
        kind.artifact_field(),
        result.artifact_path(kind).unwrap_or(""),
        result.json_sidecar_path,
        result
            .server_render_ms()
            .map_or_else(|| "n/a".to_string(), format_f64),
        total_ms,
        result.client_timing_ms,
    )
}

/// Single owner of the configuration being edited and exported
#[derive(Debug, Clone)]
pub struct ExportSession {
    request: ExportRequest,
    violations: Vec<Violation>,
    validator: Validator,
    render_metrics: Option<PerformanceSidecar>,
    last_result: Option<ExportResult>,
    last_error: Option<String>,
    activity: ActivityLog,
}

impl ExportSession {
    pub fn new(request: ExportRequest) -> Self {
        Self::builder().with_request(request).build()
    }

    pub fn builder() -> ExportSessionBuilder {
        ExportSessionBuilder::new()
    }

    pub fn request(&self) -> &ExportRequest {
        &self.request
    }

    /// Owned copy of the current configuration
    pub fn snapshot(&self) -> ExportRequest {
        self.request.clone()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Apply an edit and re-validate
    pub fn update<F>(&mut self, edit: F) -> &[Violation]
    where
        F: FnOnce(&mut ExportRequest),
    {
        edit(&mut self.request);
        self.revalidate()
    }

    /// Replace the whole configuration
    pub fn replace(&mut self, request: ExportRequest) -> &[Violation] {
        self.request = request;
        self.revalidate()
    }

    /// Switch mode and reset the slicing fields to that mode's default
    pub fn set_mode(&mut self, mode: Mode) -> &[Violation] {
        self.update(|request| {
            request.mode = mode;
            match mode {
                Mode::TwoD => {
                    request.z_slice = Some(0);
                    request.z_height = None;
                }
                Mode::ThreeD => {
                    request.z_slice = None;
                    request.z_height = Some(0.0);
                }
            }
        })
    }

    /// Switch AP selection type. Going to `single` keeps only the first id
    /// and clears `multi_ap_mode`.
    pub fn set_ap_selection_type(&mut self, selection_type: ApSelectionType) -> &[Violation] {
        self.update(|request| {
            request.ap_selection.selection_type = selection_type;
            if selection_type == ApSelectionType::Single {
                request.ap_selection.ap_ids.truncate(1);
                request.multi_ap_mode = None;
            }
        })
    }

    pub fn set_ap_ids_csv(&mut self, text: &str) -> &[Violation] {
        let ids = parse_id_list(text);
        self.update(|request| request.ap_selection.ap_ids = ids)
    }

    pub fn set_grid_ids_csv(&mut self, text: &str) -> &[Violation] {
        let ids = parse_id_list(text);
        self.update(|request| request.data_refs.grid_ids = ids)
    }

    pub fn set_mask_ids_csv(&mut self, text: &str) -> &[Violation] {
        let ids = parse_id_list(text);
        self.update(|request| request.data_refs.mask_ids = ids)
    }

    /// Latest measurements reported by the renderer
    pub fn record_render_metrics(&mut self, metrics: PerformanceSidecar) {
        self.render_metrics = Some(metrics);
    }

    pub fn render_metrics(&self) -> Option<&PerformanceSidecar> {
        self.render_metrics.as_ref()
    }

    /// Fingerprint of the current configuration
    ///
    /// # Errors
    /// Returns an error when the request cannot be serialized.
    pub fn config_hash(&self) -> Result<ConfigHash, SerializationError> {
        ConfigHasher::new().hash(&self.request)
    }

    /// `Units: … | CRS: … | Seed: … | Config Hash: …`
    ///
    /// # Errors
    /// Returns an error when the request cannot be serialized.
    pub fn status_line(&self) -> Result<String, SerializationError> {
        Ok(format!(
            "Units: {} | CRS: {} | Seed: {} | Config Hash: {}",
            describe_units(&self.request.units),
            self.request.crs,
            self.request.seed,
            self.config_hash()?,
        ))
    }

    pub fn last_result(&self) -> Option<&ExportResult> {
        self.last_result.as_ref()
    }

    /// Text of the most recent failure, cleared when an export starts
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Export the current snapshot with the latest render metrics attached.
    ///
    /// Borrowing the session mutably keeps one export in flight per session.
    ///
    /// # Errors
    /// Fails with `Validation` while violations remain, otherwise with
    /// whatever the client reports.
    pub async fn export<T: Transport>(
        &mut self,
        client: &ExportClient<T>,
        kind: ExportKind,
    ) -> Result<ExportResult, CoverageError> {
        self.last_error = None;
        self.last_result = None;

        if !self.is_valid() {
            let err = CoverageError::from(ValidationError::new(self.violations.clone()));
            self.record_failure(kind, None, &err);
            return Err(err);
        }

        let config_hash = self.config_hash()?;
        let started = Instant::now();
        let outcome = client
            .submit_export(kind, &self.request, self.render_metrics.as_ref())
            .await;
        let total_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(result) => {
                self.activity.log(
                    ActivityEntry::new(
                        ActivityLevel::Info,
                        Utc::now(),
                        success_message(kind, &result, total_ms),
                    )
                    .with_kind(kind)
                    .with_config_hash(config_hash)
                    .with_artifact(result.artifact_id.clone()),
                );
                self.last_result = Some(result.clone());
                Ok(result)
            }
            Err(err) => {
                self.record_failure(kind, Some(config_hash), &err);
                Err(err)
            }
        }
    }

    fn record_failure(&mut self, kind: ExportKind, config_hash: Option<ConfigHash>, err: &CoverageError) {
        let message = err.user_message();
        let mut entry = ActivityEntry::new(ActivityLevel::Error, Utc::now(), message.clone()).with_kind(kind);
        if let Some(hash) = config_hash {
            entry = entry.with_config_hash(hash);
        }
        self.activity.log(entry);
        self.last_error = Some(message);
    }

    fn revalidate(&mut self) -> &[Violation] {
        self.violations = self.validator.validate_request(&self.request);
        &self.violations
    }
}

impl Default for ExportSession {
    fn default() -> Self {
        Self::new(ExportRequest::default())
    }
}

/// Builder for [`ExportSession`]
#[derive(Debug, Clone, Default)]
pub struct ExportSessionBuilder {
    request: Option<ExportRequest>,
    validator: Option<Validator>,
    activity: Option<ActivityLog>,
}

impl ExportSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request(mut self, request: ExportRequest) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_activity_log(mut self, activity: ActivityLog) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn build(self) -> ExportSession {
        let mut session = ExportSession {
            request: self.request.unwrap_or_default(),
            violations: Vec::new(),
            validator: self.validator.unwrap_or_default(),
            render_metrics: None,
            last_result: None,
            last_error: None,
            activity: self.activity.unwrap_or_default(),
        };
        session.revalidate();
        session
    }
}
