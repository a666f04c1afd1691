use armament_helper_lib::cli::Cli;
use clap::Parser;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    armament_helper_lib::run(Cli::parse())
}
