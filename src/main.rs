mod config;
mod controller;
mod core;
mod error;
mod hardware;
mod input;
mod playback;

use anyhow::{bail, Context, Result};
use config::{PortSettings, RunConfig};
use controller::CageController;
use playback::RunState;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// On-disk configuration: run parameters plus optional port assignments
#[derive(Debug, Deserialize)]
struct CliConfig {
    #[serde(flatten)]
    run: RunConfig,
    #[serde(default)]
    ports: Option<PortSettings>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        bail!("usage: hcage <config.json> <dataset.csv>");
    }

    let raw = fs::read_to_string(&args[1])
        .with_context(|| format!("cannot read configuration file {}", args[1]))?;
    let cli: CliConfig = serde_json::from_str(&raw).context("invalid configuration file")?;
    cli.run.validate()?;

    let mut controller = CageController::new();
    let samples = controller.extract(Path::new(&args[2]))?;
    info!(
        samples,
        nominal_duration_ms = cli.run.nominal_duration_ms(samples),
        "dataset ready"
    );

    if cli.run.debug_mode {
        info!("debug mode: hardware writes are suppressed");
        controller.connect_mock();
    } else {
        let ports = cli
            .ports
            .as_ref()
            .context("configuration must name ports unless debug_mode is set")?;
        controller.connect(ports).await?;
    }

    let mut status = controller.start(&cli.run).await?;
    if let Some(control) = controller.control_handle() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping run");
                control.stop();
            }
        });
    }

    let mut final_state = RunState::Idle;
    while let Some(event) = status.recv().await {
        final_state = event.state;
        if let Some(err) = &event.last_error {
            error!(index = event.index, error = %err, "run failure");
        } else {
            match event.state {
                RunState::Running => {
                    info!(index = event.index, total = event.total, "dispatched")
                }
                state => info!(index = event.index, ?state, "state change"),
            }
        }
    }

    controller.wait().await;
    controller.disconnect().await;
    if !final_state.is_terminal() {
        warn!("status stream ended before a terminal state");
    }
    info!(?final_state, "run finished");
    Ok(())
}
