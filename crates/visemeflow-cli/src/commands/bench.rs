//! Bench command - per-stage performance of the pipeline

use anyhow::{Context, Result};
use console::{style, Term};
use visemeflow_core::viseme::OVR_VISEME_COUNT;
use visemeflow_core::{Config, EnergyOracle, Pipeline, PipelineResult, RawFrame, Timings};

pub fn run(config: &Config, iterations: u32, frames: usize, file: Option<&str>) -> Result<()> {
    let term = Term::stdout();
    let iterations = iterations.max(1);

    term.write_line(&format!("{} VisemeFlow Benchmark", style("⚡").yellow()))?;
    term.write_line("")?;

    let pipeline = Pipeline::new(config)?;

    let mut run_once: Box<dyn FnMut() -> Result<PipelineResult> + '_> = if let Some(path) = file {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path))?;
        term.write_line(&format!("Cooking {} with the energy oracle", path))?;
        let pipeline = &pipeline;
        Box::new(move || {
            let mut oracle = EnergyOracle::default();
            Ok(pipeline.cook(&bytes, &mut oracle)?)
        })
    } else {
        term.write_line(&format!(
            "Using synthetic frames ({} x {} visemes)",
            frames, OVR_VISEME_COUNT
        ))?;
        let input = synthetic_frames(frames, OVR_VISEME_COUNT);
        let pipeline = &pipeline;
        Box::new(move || Ok(pipeline.process(input.clone())?))
    };

    term.write_line(&format!("Iterations: {}", iterations))?;
    term.write_line("")?;

    let mut runs: Vec<Timings> = Vec::with_capacity(iterations as usize);
    let mut duration_secs = 0.0;

    for i in 0..iterations {
        tracing::debug!("Run {}/{}", i + 1, iterations);
        let result = run_once()?;
        duration_secs = result.sequence.duration_secs();
        runs.push(result.timings);
    }

    term.write_line(&format!("{}", style("Results:").bold()))?;
    term.write_line("")?;

    let avg = |f: fn(&Timings) -> u64| runs.iter().map(f).sum::<u64>() / runs.len() as u64;
    let min_total = runs.iter().map(|t| t.total_us).min().unwrap_or(0);
    let max_total = runs.iter().map(|t| t.total_us).max().unwrap_or(0);
    let avg_total = avg(|t| t.total_us);

    if file.is_some() {
        term.write_line(&format!(
            "Collect:    avg {}us",
            style(avg(|t| t.collect_us)).cyan()
        ))?;
    }
    term.write_line(&format!("Hold:       avg {}us", style(avg(|t| t.hold_us)).cyan()))?;
    term.write_line(&format!("Cluster:    avg {}us", style(avg(|t| t.cluster_us)).cyan()))?;
    term.write_line(&format!("Smooth:     avg {}us", style(avg(|t| t.smooth_us)).cyan()))?;
    term.write_line(&format!(
        "Total:      avg {}us (min: {}, max: {})",
        style(avg_total).green(),
        min_total,
        max_total
    ))?;

    if avg_total > 0 {
        let speedup = duration_secs * 1_000_000.0 / avg_total as f32;
        term.write_line(&format!(
            "Faster than real time: {}x",
            style(format!("{:.0}", speedup)).green()
        ))?;
    }

    Ok(())
}

/// Deterministic classifier-like output: a slowly wandering dominant channel with noise
fn synthetic_frames(count: usize, width: usize) -> Vec<RawFrame> {
    let mut state: u32 = 0x9e37_79b9;
    let mut noise = move || {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state as f32 / u32::MAX as f32
    };

    (0..count)
        .map(|i| {
            let dominant = (i / 8) % width;
            let visemes = (0..width)
                .map(|c| {
                    let base = if c == dominant { 0.8 } else { 0.0 };
                    (base + 0.3 * noise()).min(1.0)
                })
                .collect();
            RawFrame::new(visemes, 0.0)
        })
        .collect()
}
