//! Smooth command - post-process precomputed classifier frames

use anyhow::{Context, Result};
use console::{style, Term};
use visemeflow_core::{Config, Pipeline, RawFrame};

/// Parse a frame file: a bare array of frames or `{"frames": [...]}`
pub fn parse_frames(text: &str) -> Result<Vec<RawFrame>> {
    let value: serde_json::Value = serde_json::from_str(text).context("Invalid JSON")?;
    let frames = match value {
        serde_json::Value::Object(mut map) => map
            .remove("frames")
            .context("Expected an array of frames or an object with a \"frames\" field")?,
        other => other,
    };
    serde_json::from_value(frames).context("Invalid frame list")
}

pub fn run(config: &Config, path: &str, json: bool, output: Option<&str>) -> Result<()> {
    let term = Term::stdout();

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames from {}", path))?;
    let frames = parse_frames(&text).with_context(|| format!("Failed to parse {}", path))?;

    if !json {
        term.write_line(&format!(
            "{} Loaded {} raw frames from {}",
            style("📁").cyan(),
            frames.len(),
            path
        ))?;
    }

    let result = Pipeline::new(config)?.process(frames)?;

    if super::emit_json(&result, json, output)? {
        return Ok(());
    }
    super::print_summary(&term, &result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let frames = parse_frames(r#"[{"visemes": [0.1, 0.9], "laughter": 0.2}, {"visemes": [0.0, 0.0]}]"#)
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].laughter, 0.2);
        assert_eq!(frames[1].laughter, 0.0);
    }

    #[test]
    fn test_parse_wrapped_frames() {
        let frames = parse_frames(r#"{"frame_duration_secs": 0.01, "frames": [{"visemes": [1.0]}]}"#).unwrap();
        assert_eq!(frames, vec![RawFrame::new(vec![1.0], 0.0)]);
    }

    #[test]
    fn test_parse_rejects_object_without_frames() {
        assert!(parse_frames(r#"{"visemes": [1.0]}"#).is_err());
    }
}
