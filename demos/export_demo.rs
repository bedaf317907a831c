//! Export Demo
//!
//! Walks through one editing and export session:
//! - Building and validating a 2D configuration
//! - Switching to a 3D multi-AP configuration and fixing its violations
//! - Printing the reproducibility status line
//! - Checking service health and submitting a PNG export when a service is configured
//!
//! Set `COVERAGE_API_BASE` (or `COVERAGE_BACKEND_URL`) to reach a running
//! service; `RUST_LOG=coverage_export=debug` shows the client's tracing output.

use std::sync::Arc;

use coverage_export::{
    ApSelectionType, ExportClient, ExportKind, ExportSession, HealthMonitor, Mode, MultiApMode,
    PerformanceSidecar, ServiceConfig,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Helpers
// ============================================================================

fn print_violations(session: &ExportSession) {
    if session.is_valid() {
        println!("  ✓ configuration is valid");
    } else {
        for violation in session.violations() {
            println!("  ✗ {}", violation);
        }
    }
}

fn print_status(session: &ExportSession) {
    match session.status_line() {
        Ok(line) => println!("  {}", line),
        Err(err) => println!("  status unavailable: {}", err),
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Coverage Export Demo ===\n");

    let mut session = ExportSession::default();
    println!("Default 2D configuration:");
    print_violations(&session);
    print_status(&session);

    println!("\nSwitching to 3D with two APs:");
    session.set_mode(Mode::ThreeD);
    session.set_ap_ids_csv("ap-1, ap-2");
    session.set_ap_selection_type(ApSelectionType::Multi);
    print_violations(&session);

    println!("\nChoosing a multi-AP mode:");
    session.update(|request| {
        request.multi_ap_mode = Some(MultiApMode::MaxRssi);
        request.z_height = Some(1.5);
    });
    print_violations(&session);
    print_status(&session);

    session.record_render_metrics(PerformanceSidecar {
        render_ms: Some(41.0),
        peak_mem_mb: Some(96.0),
        downsampling_factor: None,
    });

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            println!("\n{}; skipping export", err);
            return Ok(());
        }
    };
    println!("\nService: {:?}", config);

    let client = Arc::new(ExportClient::new(config)?);
    let monitor = HealthMonitor::from_config(Arc::clone(&client)).start();
    let mut updates = monitor.subscribe();
    updates.changed().await?;
    println!("Service health: {}", monitor.status().describe());

    match session.export(&*client, ExportKind::Png).await {
        Ok(_) => {
            if let Some(entry) = session.activity().latest() {
                println!("\n{}", entry.message);
            }
        }
        Err(err) => println!("\nExport failed: {}", err.user_message()),
    }

    monitor.stop().await;
    Ok(())
}
