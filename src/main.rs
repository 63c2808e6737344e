pub mod bridge;
pub mod config;
pub mod input;
pub mod select;
pub mod transport;
pub mod wire;

use clap::Parser;
use color_eyre::Result;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::bridge::engine::BridgeEngine;
use crate::bridge::focus;
use crate::config::BridgeConfig;
use crate::input::InputSelector;
use crate::select::{BridgeArgs, InputSelection};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let args = BridgeArgs::parse();
    let config = BridgeConfig::load(args.config.as_deref())?;

    let transport = select::open_transport(&args, &config)?;
    let mut selection = InputSelection::new(&args, &config);
    let input = selection.acquire().map_err(bridge::BridgeError::Input)?;
    let focus = focus::probe_for(args.window.as_deref());

    // Ctrl-C flips the shutdown flag; the engine leaves its loop on the
    // next tick boundary and releases the transport.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let engine = BridgeEngine::create(
        transport,
        input,
        Box::new(selection),
        focus,
        config.engine_settings(),
    );
    let engine = engine.connect();
    let engine = engine.synchronize()?;
    engine.run_until_shutdown(shutdown_rx).await?;

    info!("Bridge stopped");
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}
