pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

use cli::{Cli, Command};
use commands::config::{init_config, init_config_manager, load_region_box, save_region_box};
use commands::tracking::{run_tracking, TrackingOptions};
use models::region::{RegionId, RelativeRect};
use std::time::Duration;
use tracing::{info, warn};

pub fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let manager = init_config_manager(cli.config.clone())?;

    match cli.command {
        Some(Command::ConfigPath) => {
            println!("{}", manager.config_file_path().display());
            return Ok(());
        }
        Some(Command::InitConfig { force }) => {
            if init_config(&manager, force)? {
                println!("wrote {}", manager.config_file_path().display());
            } else {
                println!("{} already exists", manager.config_file_path().display());
            }
            return Ok(());
        }
        Some(Command::SetBox {
            region,
            top,
            bottom,
            left,
            right,
        }) => {
            save_region_box(
                &manager,
                &RegionId::new(region),
                RelativeRect::new(top, bottom, left, right),
            )?;
            return Ok(());
        }
        Some(Command::ShowBox { region }) => {
            let rect = load_region_box(&manager, &RegionId::new(region))?;
            println!("{}", serde_json::to_string_pretty(&rect)?);
            return Ok(());
        }
        None => {}
    }

    let mut config = manager.load()?;
    if cli.debug {
        config.debug.dump_frames = true;
    }

    let log_path = logging::init_tracing(
        cli.debug,
        config.debug.json_logs,
        Some(&logging::default_log_dir()),
    )?;
    if let Some(path) = &log_path {
        info!(path = %path.display(), "error log");
    }

    let screenshot = cli
        .screenshot
        .ok_or("--screenshot is required to run the recognizers")?;
    let options = TrackingOptions {
        screenshot,
        catalog: cli.catalog,
        duration: cli.duration_secs.map(Duration::from_secs),
        character: cli.character,
        paused_targets: cli.pause.into_iter().map(RegionId::new).collect(),
        weapon_tier: cli.weapon_tier,
    };

    let report = run_tracking(config, options)?;
    for summary in &report.loops {
        if let Some(error) = &summary.fatal_error {
            warn!(target_id = %summary.target, error = %error, "loop ended with error");
        }
        info!(
            target_id = %summary.target,
            polls = summary.polls,
            ocr_calls = summary.ocr_calls,
            "loop summary"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
    Ok(())
}
