// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use std::fs::File;
use std::io::Read;
use tracing::info;

/// RPM lead magic: 0xED 0xAB 0xEE 0xDB
const RPM_MAGIC: [u8; 4] = [0xED, 0xAB, 0xEE, 0xDB];

/// Refuse files that do not start with the RPM lead magic
fn check_rpm_magic(path: &str) -> Result<()> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|_| anyhow::anyhow!("{} is too short to be an RPM package", path))?;

    if magic != RPM_MAGIC {
        anyhow::bail!("{} is not an RPM package", path);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            rpm,
            output,
            config,
            dry_run,
        } => {
            check_rpm_magic(&rpm)?;
            info!("Converting {} into {}", rpm, output);
            commands::cmd_convert(&rpm, &output, config.as_deref(), dry_run)
        }
        Commands::ShowConfig { config } => commands::cmd_show_config(config.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "rpm2recipe",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
