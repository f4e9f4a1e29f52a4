//! Monitor mode — wires the collaborators together and runs the poll loop.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use ztwatch_client::{HttpClient, TelegramSink, ZeroTierClient};
use ztwatch_core::{MonitorConfig, SystemClock};
use ztwatch_health::{PingProbe, PollMonitor};
use ztwatch_state::StateStore;

pub(crate) async fn run(config: MonitorConfig, data_dir: &Path, once: bool) -> anyhow::Result<()> {
    info!("ztwatch daemon starting");

    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("ztwatch.redb");
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let http = HttpClient::new(&config.http)?;
    let source = ZeroTierClient::new(http.clone(), config.networks.clone());
    let sink = TelegramSink::new(http, &config.telegram);
    if !sink.is_configured() {
        warn!("telegram bot token or chat id missing, reports will only be logged");
    }
    let probe = PingProbe::new(Duration::from_secs(config.probe.timeout_secs));

    let monitor = PollMonitor::new(config, store, source, sink, probe, Arc::new(SystemClock))?;

    if once {
        let summary = monitor.run_cycle().await?;
        info!(
            evaluated = summary.evaluated,
            reports = summary.reports.len(),
            skipped = summary.skipped,
            "single cycle finished"
        );
        for report in &summary.reports {
            println!("{report}");
        }
        return Ok(());
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_handle = tokio::spawn(async move {
        monitor.run(shutdown_rx).await;
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    monitor_handle.await?;
    info!("ztwatch daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
