//! Config command - manage configuration

use anyhow::{bail, Context, Result};
use console::{style, Term};
use std::path::PathBuf;
use visemeflow_core::viseme::{resolve_channel, viseme_name, VisemeClass};
use visemeflow_core::{Config, DepthPolicy};

pub fn show(config: &Config) -> Result<()> {
    let term = Term::stdout();
    let settings = &config.interpolation;

    term.write_line(&format!("{}", style("VisemeFlow Configuration").bold()))?;
    term.write_line("")?;

    term.write_line(&format!(
        "Depth policy:        {}",
        style(config.depth_policy.display_name()).cyan()
    ))?;
    term.write_line(&format!(
        "Interpolation:       {}",
        style(settings.enable_interpolation).cyan()
    ))?;
    term.write_line(&format!(
        "Interp. frames:      {} (effective {})",
        style(settings.max_interpolation_frames).cyan(),
        settings.interpolation_frames()
    ))?;
    term.write_line(&format!(
        "Consonant lock:      {}",
        style(settings.strict_consonant_lock).cyan()
    ))?;
    term.write_line(&format!(
        "Min hold frames:     {}",
        style(settings.min_hold_frames).cyan()
    ))?;

    term.write_line("")?;
    term.write_line(&format!("{}", style("Audio:").dim()))?;
    term.write_line(&format!("  Chunk:            {}ms", config.audio.chunk_ms))?;
    term.write_line(&format!("  Buffer size:      {}", config.audio.buffer_size))?;
    term.write_line(&format!(
        "  Header fallback:  {}",
        config.audio.fallback_on_bad_header
    ))?;

    let tables = &config.tables;
    if tables.replace_defaults || !tables.classification.is_empty() || !tables.priority.is_empty() {
        term.write_line("")?;
        term.write_line(&format!("{}", style("Table overrides:").dim()))?;
        if tables.replace_defaults {
            term.write_line("  (defaults replaced)")?;
        }
        for (key, class) in &tables.classification {
            term.write_line(&format!("  class.{} = {}", key, class.display_name()))?;
        }
        for (key, weight) in &tables.priority {
            term.write_line(&format!("  priority.{} = {}", key, weight))?;
        }
    }

    Ok(())
}

/// Apply one `key value` pair; returns a description of the change
pub fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<String> {
    let normalized = key.to_lowercase().replace('_', "-");

    if let Some(channel) = normalized.strip_prefix("priority.") {
        let weight: f32 = value.parse().with_context(|| format!("Invalid priority '{}'", value))?;
        let name = channel_key(channel)?;
        config.tables.priority.insert(name.clone(), weight);
        return Ok(format!("priority of {} set to {}", name, weight));
    }

    if let Some(channel) = normalized.strip_prefix("class.") {
        let class = match value.to_lowercase().as_str() {
            "vowel" => VisemeClass::Vowel,
            "consonant" => VisemeClass::Consonant,
            "other" => VisemeClass::Other,
            _ => bail!("Unknown class '{}'. Available: vowel, consonant, other", value),
        };
        let name = channel_key(channel)?;
        config.tables.classification.insert(name.clone(), class);
        return Ok(format!("class of {} set to {}", name, class.display_name()));
    }

    let settings = &mut config.interpolation;
    match normalized.as_str() {
        "depth-policy" => {
            config.depth_policy = value.parse::<DepthPolicy>().map_err(anyhow::Error::msg)?;
        }
        "max-interpolation-frames" => settings.max_interpolation_frames = parse(value)?,
        "min-hold-frames" => settings.min_hold_frames = parse(value)?,
        "enable-interpolation" => settings.enable_interpolation = parse(value)?,
        "strict-consonant-lock" => settings.strict_consonant_lock = parse(value)?,
        "chunk-ms" => config.audio.chunk_ms = parse(value)?,
        "buffer-size" => config.audio.buffer_size = parse(value)?,
        "fallback-on-bad-header" => config.audio.fallback_on_bad_header = parse(value)?,
        "replace-defaults" => config.tables.replace_defaults = parse(value)?,
        _ => bail!(
            "Unknown setting '{}'. Available: depth-policy, max-interpolation-frames, min-hold-frames, \
             enable-interpolation, strict-consonant-lock, chunk-ms, buffer-size, \
             fallback-on-bad-header, replace-defaults, priority.<channel>, class.<channel>",
            key
        ),
    }

    Ok(format!("{} set to {}", normalized, value))
}

fn parse<T: std::str::FromStr>(value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid value '{}'", value))
}

/// Canonical table key for a channel: its OVR name when it has one
fn channel_key(channel: &str) -> Result<String> {
    let index = resolve_channel(channel)?;
    Ok(viseme_name(index).map_or_else(|| index.to_string(), str::to_string))
}

pub fn set(config: &mut Config, path: Option<&str>, key: &str, value: &str) -> Result<()> {
    let term = Term::stdout();

    let mut updated = config.clone();
    let change = apply_setting(&mut updated, key, value)?;
    updated.validate().context("Setting rejected")?;

    updated.save(path)?;
    *config = updated;

    term.write_line(&format!("{} {}", style("✓").green(), change))?;
    Ok(())
}

pub fn reset(path: Option<&str>) -> Result<()> {
    let term = Term::stdout();
    Config::default().save(path)?;
    term.write_line(&format!(
        "{} Configuration reset to defaults",
        style("✓").green()
    ))?;
    Ok(())
}

pub fn show_path(path: Option<&str>) -> Result<()> {
    let term = Term::stdout();
    let config_path = match path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()?,
    };

    term.write_line(&format!("Config file: {:?}", config_path))?;

    if config_path.exists() {
        term.write_line(&format!("{} File exists", style("✓").green()))?;
    } else {
        term.write_line(&format!(
            "{} File does not exist (using defaults)",
            style("ℹ").blue()
        ))?;
    }

    Ok(())
}
