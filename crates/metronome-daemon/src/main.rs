use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use metronome_scheduler::{SchedulerConfig, SchedulerEngine, TaskAction, TaskRegistry};
use tokio::sync::watch;
use tracing::info;

/// Logs a heartbeat with a monotonically increasing beat number.
struct Heartbeat {
    beats: AtomicU64,
}

#[async_trait]
impl TaskAction for Heartbeat {
    async fn run(&self) -> anyhow::Result<()> {
        let beat = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
        info!(beat, "heartbeat");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metronomed=info,metronome_scheduler=info".into()),
        )
        .init();

    // load config: explicit path via METRONOME_CONFIG > ~/.metronome/metronome.toml
    let config_path = std::env::var("METRONOME_CONFIG").ok();
    let config = SchedulerConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        SchedulerConfig::default()
    });

    // Tasks are registered in code, once, before the engine starts.
    let mut registry = TaskRegistry::new();
    registry.register(
        "heartbeat",
        "0 * * * * *",
        true,
        Heartbeat {
            beats: AtomicU64::new(0),
        },
    )?;
    registry.register("uptime", "*/10 * * * * *", true, || async {
        info!("scheduler alive");
        anyhow::Ok(())
    })?;
    info!(tasks = registry.len(), "task registry populated");

    let engine = SchedulerEngine::new(registry, config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    shutdown_signal().await;
    info!("shutdown signal received, stopping scheduler");
    let _ = shutdown_tx.send(true);
    // In-flight firings run to completion on the runtime; only the loop is
    // waited on here.
    let _ = engine_task.await;

    Ok(())
}

/// Resolves when the process receives SIGINT or SIGTERM.
///
/// On Unix both signals are handled so container orchestrators trigger a
/// clean loop shutdown. On non-Unix only Ctrl-C (SIGINT) is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}
