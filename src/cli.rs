use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Recognize menu, character and item names on screen and label armaments
#[derive(Debug, Parser)]
#[command(name = "armament-helper", version, about)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging and OCR input dumps
    #[arg(long, global = true)]
    pub debug: bool,

    /// Screenshot file, or a directory whose newest image is used
    #[arg(long)]
    pub screenshot: Option<PathBuf>,

    /// Catalog JSON replacing the built-in one
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Current character, for when character detection is paused
    #[arg(long)]
    pub character: Option<String>,

    /// Start the loop of this target paused (repeatable)
    #[arg(long, value_name = "TARGET")]
    pub pause: Vec<String>,

    /// Add the overall weapon tier to item labels
    #[arg(long)]
    pub weapon_tier: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the config file path
    ConfigPath,
    /// Write the default configuration
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a region's relative capture box
    SetBox {
        region: String,
        top: f32,
        bottom: f32,
        left: f32,
        right: f32,
    },
    /// Print a region's relative capture box
    ShowBox { region: String },
}
