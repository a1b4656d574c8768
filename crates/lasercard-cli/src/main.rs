//! Command preview for lasercard driver configurations.
//!
//! Connects every card of a driver configuration against the recording SDK,
//! builds the scan list of a JSON layer for each card and prints the
//! resulting commands. With `--draw` the layer is also run through the full
//! upload, execute and cleanup cycle.
//!
//! ```sh
//! RUST_LOG=lasercard_driver=debug lasercard --config cards.json --layer layer.json --draw
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use lasercard_driver::mock::MockSdk;
use lasercard_driver::{DriverConfig, LaserCardDriver, LayerData, Sdk, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lasercard")]
#[command(about = "Preview the scan lists a layer produces on each configured card", long_about = None)]
struct Args {
    /// Driver configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Layer to draw (JSON)
    #[arg(short, long)]
    layer: PathBuf,

    /// Also run the draw cycle and print the device call trace
    #[arg(long)]
    draw: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = DriverConfig::load(&args.config)
        .with_context(|| format!("loading driver config {}", args.config.display()))?;
    if config.simulation_mode {
        warn!("Simulation mode ignored, previewing against the recording SDK");
        config.simulation_mode = false;
    }

    let layer_json = fs::read_to_string(&args.layer)
        .with_context(|| format!("reading layer {}", args.layer.display()))?;
    let layer = LayerData::from_json(&layer_json)?;
    info!(segments = layer.segments.len(), cards = config.cards.len(), "Loaded layer");

    let mock = Arc::new(MockSdk::new());
    let mut driver = LaserCardDriver::from_config(&config, Some(Sdk::new(mock.clone())), Arc::new(SystemClock))?;
    let names: Vec<String> = driver.card_names().map(str::to_string).collect();

    for name in &names {
        let session = driver.get_connected_card(name)?;
        let laser_index = session.assigned_laser_index();

        let mut list = session.create_list()?;
        list.add_layer_to_list(&layer, laser_index, false)?;

        println!(
            "== {} ({}:{}) laser index {}, {} commands",
            name,
            session.ip(),
            session.port(),
            laser_index,
            list.command_count()
        );
        for command in mock.commands(list.handle()) {
            println!("  {}", command);
        }
    }

    if args.draw {
        mock.clear_calls();
        let multi_laser = names
            .iter()
            .filter_map(|name| driver.get_connected_card(name).ok())
            .any(|session| session.assigned_laser_index() != 0);

        if multi_laser {
            driver.draw_layer_multi_laser(&layer, false, config.scanning_timeout_ms)?;
        } else {
            for name in &names {
                driver
                    .get_connected_card_mut(name)?
                    .draw_layer(&layer, config.scanning_timeout_ms)?;
            }
        }

        println!("== device calls");
        for call in mock.device_calls() {
            println!("  {}", call);
        }
    }

    Ok(())
}
