mod audio;
mod capture;
mod error;
mod io;
mod pipeline;
mod playback;
mod session;
#[cfg(feature = "desktop")]
mod ui;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use io::{CpalDevices, GeminiTransport};
use session::{LiveClient, LiveConfig};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = run() {
        error!("Application error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    info!("Starting LingoLab Coach...");

    if dotenv::dotenv().is_ok() {
        info!("Loaded environment from .env");
    }
    // Another crate may already have installed a provider; either is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = LiveConfig::from_env();
    info!("Using {config:?}");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("live-session")
        .build()
        .context("Failed to build tokio runtime")?;

    let client = LiveClient::spawn(
        runtime.handle(),
        config,
        Arc::new(GeminiTransport::new()),
        Arc::new(CpalDevices),
    );

    launch(client, &runtime)
}

#[cfg(feature = "desktop")]
fn launch(client: LiveClient, _runtime: &tokio::runtime::Runtime) -> Result<()> {
    use dioxus::desktop::{Config, WindowBuilder};

    // The session runtime keeps running on its own threads while the UI owns this one.
    info!("Launching UI...");
    dioxus::LaunchBuilder::desktop()
        .with_context(client)
        .with_cfg(
            Config::new().with_window(
                WindowBuilder::new()
                    .with_title("LingoLab Coach")
                    .with_always_on_top(false),
            ),
        )
        .launch(ui::App);

    Ok(())
}

#[cfg(not(feature = "desktop"))]
fn launch(client: LiveClient, runtime: &tokio::runtime::Runtime) -> Result<()> {
    use std::time::Duration;

    info!("Running headless, press Ctrl-C to end the session");
    client.start();

    runtime.block_on(async {
        let mut report = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = report.tick() => {
                    let snapshot = client.snapshot();
                    info!(
                        "status={} volume={:.2}{}",
                        snapshot.status.label(),
                        snapshot.volume,
                        snapshot
                            .error_message
                            .map(|e| format!(" error={e}"))
                            .unwrap_or_default()
                    );
                }
            }
        }
        client.stop();
        // Let the driver run its teardown before the runtime goes away.
        tokio::time::sleep(Duration::from_millis(200)).await;
    });

    Ok(())
}
