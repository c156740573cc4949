//! Cinder CLI - inspection and conversion tool for Cinder cartridges
//!
//! # Commands
//!
//! - `cinder info` - Show section occupancy and code statistics for a cart
//! - `cinder convert` - Transcode a cart between .p8, .p8.png and .bin
//!
//! # Usage
//!
//! ```bash
//! # Inspect a cart (any loadable form)
//! cinder info game.p8.png
//!
//! # The same, machine-readable
//! cinder info game.p8.png --json
//!
//! # Transcode between forms (output form picked by extension)
//! cinder convert game.p8 game.p8.png
//! cinder convert game.p8.png game.bin
//! ```

mod convert;
mod info;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Cinder CLI - cartridge tool for the Cinder fantasy console
#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Cartridge tool for the Cinder fantasy console")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show section occupancy and code statistics for a cart
    Info(info::InfoArgs),

    /// Transcode a cart between the .p8, .p8.png and .bin forms
    Convert(convert::ConvertArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Info(args) => info::execute(args),
        Commands::Convert(args) => convert::execute(args),
    }
}
