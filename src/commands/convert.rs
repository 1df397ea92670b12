// src/commands/convert.rs

//! Convert RPM to Recipe command

use anyhow::{Context, Result};
use rpm2recipe::{ImportConfig, RpmConverter, RpmHeaderReader};
use std::path::Path;
use tracing::info;

/// Convert an RPM package to a Conary recipe
///
/// # Arguments
/// * `rpm_path` - Path to the RPM file
/// * `output` - Directory receiving the recipe and its side files
/// * `config` - Optional import configuration file
/// * `dry_run` - Print the recipe instead of writing it
pub fn cmd_convert(rpm_path: &str, output: &str, config: Option<&str>, dry_run: bool) -> Result<()> {
    let config = ImportConfig::load_or_default(config.map(Path::new))?;
    let converter = RpmConverter::new(config);

    // Read and convert; a bad header stops here with nothing written
    let result = converter
        .convert_file(Path::new(rpm_path), &RpmHeaderReader::new())
        .with_context(|| format!("Failed to convert {}", rpm_path))?;

    let name = result.document.name.clone();

    if dry_run {
        println!("{}", result.document.render());
        for side in &result.document.side_files {
            println!("# --- {} ---", side.name);
            print!("{}", side.contents);
        }
        for recipe in &result.info_recipes {
            println!("# --- {} ---", recipe.file_name());
            print!("{}", recipe.text);
        }
    } else {
        let written = result
            .write_to(Path::new(output))
            .with_context(|| format!("Failed to write recipe to {}", output))?;
        for path in &written {
            info!("Wrote {}", path.display());
        }
        println!("Recipe written to: {}", Path::new(output).join(result.document.file_name()).display());
    }

    result.report.print_summary(&name);

    println!("\nConverted: {} version {}", name, result.document.version);
    if !result.report.advisories.is_empty() {
        println!(
            "{} advisory(ies) - review recipe before use",
            result.report.advisories.len()
        );
    }

    Ok(())
}

/// Print the effective import configuration as TOML
pub fn cmd_show_config(config: Option<&str>) -> Result<()> {
    let config = ImportConfig::load_or_default(config.map(Path::new))?;
    print!("{}", config.to_toml()?);
    Ok(())
}
