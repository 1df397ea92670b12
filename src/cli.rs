// src/cli.rs
//! CLI definitions for rpm2recipe
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "rpm2recipe")]
#[command(author = "Conary Project")]
#[command(version)]
#[command(about = "Convert RPM packages into Conary recipes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert an RPM package into a Conary recipe
    ///
    /// Writes `<name>.recipe` plus the tag handler files and info recipes it
    /// needs into the output directory.
    Convert {
        /// Path to the RPM package
        rpm: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: String,

        /// Import configuration file (TOML)
        #[arg(short, long)]
        config: Option<String>,

        /// Print the recipe instead of writing any files
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the effective import configuration
    ShowConfig {
        /// Import configuration file (TOML)
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
