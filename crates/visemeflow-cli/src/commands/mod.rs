//! Subcommand implementations

pub mod bench;
pub mod config;
pub mod cook;
pub mod smooth;
pub mod visemes;

use anyhow::{Context, Result};
use console::{style, Term};
use visemeflow_core::viseme::viseme_name;
use visemeflow_core::PipelineResult;

/// Serialize the finished sequence with its block selection
pub fn to_json(result: &PipelineResult) -> Result<String> {
    let value = serde_json::json!({
        "interpolation_frames": result.interpolation_frames,
        "blocks": result.blocks,
        "sequence": result.sequence,
    });
    serde_json::to_string_pretty(&value).context("Failed to serialize viseme sequence")
}

/// Print JSON to stdout and/or a file, per the command flags
pub fn emit_json(result: &PipelineResult, json: bool, output: Option<&str>) -> Result<bool> {
    if !json && output.is_none() {
        return Ok(false);
    }

    let text = to_json(result)?;
    if let Some(path) = output {
        std::fs::write(path, &text).with_context(|| format!("Failed to write {}", path))?;
        tracing::info!("Wrote {} frames to {}", result.sequence.len(), path);
    }
    if json {
        println!("{}", text);
    }
    Ok(json)
}

/// Human-readable summary of a pipeline run
pub fn print_summary(term: &Term, result: &PipelineResult) -> Result<()> {
    let sequence = &result.sequence;

    term.write_line("")?;
    term.write_line(&format!("{}", style("Viseme track:").bold()))?;
    term.write_line(&format!(
        "  Frames: {} x {} visemes ({:.2}s)",
        sequence.len(),
        sequence.viseme_count(),
        sequence.duration_secs()
    ))?;
    term.write_line(&format!("  Smoothing depth: {}", result.interpolation_frames))?;
    if let Some(tempo) = &result.tempo {
        term.write_line(&format!(
            "  Tempo: {:?} ({:.1} active frames per viseme)",
            tempo.tempo, tempo.average_active_frames
        ))?;
    }
    if !result.blocks.is_empty() {
        let voiced = result.blocks.iter().filter(|b| b.is_voiced()).count();
        term.write_line(&format!(
            "  Blocks: {} ({} voiced, {} silent)",
            result.blocks.len(),
            voiced,
            result.blocks.len() - voiced
        ))?;
    }
    term.write_line(&format!(
        "  Hold filter: {} short runs removed",
        result.hold.runs_zeroed
    ))?;

    // Share of frames each viseme leads
    let mut leading = vec![0usize; sequence.viseme_count()];
    for frame in sequence {
        let top = frame
            .visemes
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        if let Some(i) = top {
            leading[i] += 1;
        }
    }
    let mut ranked: Vec<(usize, usize)> = leading.into_iter().enumerate().filter(|(_, n)| *n > 0).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    if !ranked.is_empty() {
        term.write_line("")?;
        term.write_line(&format!("{}", style("Leading visemes:").dim()))?;
        for (channel, count) in ranked.iter().take(5) {
            let name = viseme_name(*channel).map_or_else(|| format!("#{}", channel), str::to_string);
            term.write_line(&format!(
                "  {:4} {:5.1}%",
                name,
                100.0 * *count as f32 / sequence.len() as f32
            ))?;
        }
    }

    term.write_line("")?;
    let timings = &result.timings;
    term.write_line(&format!(
        "{} Collect: {}us | Hold: {}us | Cluster: {}us | Smooth: {}us | Total: {}us",
        style("⏱").dim(),
        timings.collect_us,
        timings.hold_us,
        timings.cluster_us,
        timings.smooth_us,
        timings.total_us
    ))?;

    Ok(())
}
