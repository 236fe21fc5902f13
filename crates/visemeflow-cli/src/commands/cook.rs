//! Cook command - WAV file to viseme track

use anyhow::{Context, Result};
use console::{style, Term};
use std::path::Path;
use visemeflow_core::{Config, EnergyOracle, Pipeline};

pub fn run(config: &Config, path: &str, json: bool, output: Option<&str>) -> Result<()> {
    let term = Term::stdout();
    let file_path = Path::new(path);

    if !file_path.exists() {
        anyhow::bail!("File not found: {}", path);
    }

    let bytes = std::fs::read(file_path)
        .with_context(|| format!("Failed to read audio file: {}", path))?;

    if !json {
        term.write_line(&format!(
            "{} Loading audio file: {} ({} bytes)",
            style("📁").cyan(),
            path,
            bytes.len()
        ))?;
        term.write_line(&format!("{} Processing...", style("⚙").cyan()))?;
    }

    let pipeline = Pipeline::new(config)?;
    let mut oracle = EnergyOracle::default();
    let result = pipeline
        .cook(&bytes, &mut oracle)
        .with_context(|| format!("Failed to cook {}", path))?;

    if super::emit_json(&result, json, output)? {
        return Ok(());
    }
    super::print_summary(&term, &result)
}
