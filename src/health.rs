//! Periodic service liveness checks
//!
//! A [`HealthMonitor`] probes the health endpoint immediately and then on a
//! fixed interval, publishing each outcome on a watch channel. Dropping or
//! stopping the returned handle cancels the polling task.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use crate::client::{ExportClient, Transport};

/// Last known service health
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `None` until the first probe completes
    pub healthy: Option<bool>,
    pub last_checked: Option<DateTime<Utc>>,
    /// Set only when the service could not be reached
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.healthy == Some(true)
    }

    /// Short status text, e.g. `Healthy` or `Unhealthy connection refused`
    pub fn describe(&self) -> String {
        match (self.healthy, &self.error) {
            (None, _) => "checking…".to_string(),
            (Some(true), _) => "Healthy".to_string(),
            (Some(false), Some(error)) => format!("Unhealthy {}", error),
            (Some(false), None) => "Unhealthy".to_string(),
        }
    }
}

/// Probe once and record the outcome
pub async fn check_status<T: Transport>(client: &ExportClient<T>) -> HealthStatus {
    let (healthy, error) = match client.probe_health().await {
        Ok(response) => (response.is_success(), None),
        Err(err) => (false, Some(err.message)),
    };
    if healthy {
        debug!("health check passed");
    } else {
        warn!(error = error.as_deref().unwrap_or(""), "health check failed");
    }

    HealthStatus {
        healthy: Some(healthy),
        last_checked: Some(Utc::now()),
        error,
    }
}

/// Scheduled health checking for one client
pub struct HealthMonitor<T> {
    client: Arc<ExportClient<T>>,
    interval: Duration,
}

impl<T: Transport + 'static> HealthMonitor<T> {
    pub fn new(client: Arc<ExportClient<T>>, interval: Duration) -> Self {
        Self { client, interval }
    }

    /// Use the poll interval from the client's configuration
    pub fn from_config(client: Arc<ExportClient<T>>) -> Self {
        let interval = client.config().health_poll_interval();
        Self::new(client, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the polling task on the current tokio runtime.
    ///
    /// A zero interval performs a single check.
    pub fn start(self) -> HealthMonitorHandle {
        let (tx, rx) = watch::channel(HealthStatus::default());
        let Self { client, interval } = self;

        let task = tokio::spawn(async move {
            if interval.is_zero() {
                let _ = tx.send(check_status(&*client).await);
                return;
            }

            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let status = check_status(&*client).await;
                if tx.send(status).is_err() {
                    break;
                }
            }
        });

        HealthMonitorHandle {
            status: rx,
            task: Some(task),
        }
    }
}

/// Owner of a running monitor. The polling task ends when this is dropped.
#[derive(Debug)]
pub struct HealthMonitorHandle {
    status: watch::Receiver<HealthStatus>,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitorHandle {
    /// Most recent status
    pub fn status(&self) -> HealthStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every completed probe
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel polling and wait for the task to wind down
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for HealthMonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
