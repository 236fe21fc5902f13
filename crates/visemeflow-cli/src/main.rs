//! VisemeFlow CLI - Lip-sync viseme tracks from speech audio

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use visemeflow_core::{Config, DepthPolicy};

mod commands;

#[derive(Parser)]
#[command(name = "visemeflow")]
#[command(version)]
#[command(about = "Viseme post-processing for lip-sync animation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Verbose output (show per-stage timings and debug info)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Per-run overrides of the loaded interpolation settings
#[derive(Args, Debug, Default)]
struct SettingsArgs {
    /// Block size and smoothing depth (1-24)
    #[arg(long)]
    max_interpolation_frames: Option<u32>,

    /// Shortest activation kept by the hold filter
    #[arg(long)]
    min_hold_frames: Option<usize>,

    /// Skip temporal smoothing
    #[arg(long)]
    no_interpolation: bool,

    /// Let smoothing dilute strong consonants
    #[arg(long)]
    no_consonant_lock: bool,

    /// Pick the smoothing depth from speech tempo instead of clustering
    #[arg(long)]
    tempo_adaptive: bool,
}

impl SettingsArgs {
    fn apply(&self, config: &mut Config) {
        let settings = &mut config.interpolation;
        if let Some(frames) = self.max_interpolation_frames {
            settings.max_interpolation_frames = frames;
        }
        if let Some(frames) = self.min_hold_frames {
            settings.min_hold_frames = frames;
        }
        if self.no_interpolation {
            settings.enable_interpolation = false;
        }
        if self.no_consonant_lock {
            settings.strict_consonant_lock = false;
        }
        if self.tempo_adaptive {
            config.depth_policy = DepthPolicy::TempoAdaptive;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a WAV file into a viseme track using the built-in energy oracle
    Cook {
        /// Path to audio file (16-bit PCM WAV preferred)
        path: String,

        /// Print the sequence as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the JSON sequence to a file
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Post-process raw classifier frames from a JSON file
    Smooth {
        /// JSON array of {"visemes": [...], "laughter": x} frames
        path: String,

        /// Print the sequence as JSON instead of a summary
        #[arg(long)]
        json: bool,

        /// Write the JSON sequence to a file
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Measure per-stage processing time
    Bench {
        /// Number of iterations
        #[arg(short, long, default_value = "10")]
        iterations: u32,

        /// Synthetic utterance length in frames
        #[arg(long, default_value = "1000")]
        frames: usize,

        /// Cook this WAV file instead of synthetic frames
        #[arg(short, long)]
        file: Option<String>,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// List viseme channels with their class and priority
    Visemes,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value (e.g. `min-hold-frames 3`, `priority.SS 0.8`)
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },

    /// Restore the default configuration
    Reset,

    /// Show config file path
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Cook {
            path,
            json,
            output,
            settings,
        } => {
            settings.apply(&mut config);
            commands::cook::run(&config, &path, json, output.as_deref())
        }

        Commands::Smooth {
            path,
            json,
            output,
            settings,
        } => {
            settings.apply(&mut config);
            commands::smooth::run(&config, &path, json, output.as_deref())
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config),
            ConfigAction::Set { key, value } => {
                commands::config::set(&mut config, cli.config.as_deref(), &key, &value)
            }
            ConfigAction::Reset => commands::config::reset(cli.config.as_deref()),
            ConfigAction::Path => commands::config::show_path(cli.config.as_deref()),
        },

        Commands::Bench {
            iterations,
            frames,
            file,
            settings,
        } => {
            settings.apply(&mut config);
            commands::bench::run(&config, iterations, frames, file.as_deref())
        }

        Commands::Visemes => commands::visemes::list(&config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_override() {
        let cli = Cli::parse_from([
            "visemeflow",
            "smooth",
            "frames.json",
            "--max-interpolation-frames",
            "10",
            "--no-consonant-lock",
            "--tempo-adaptive",
        ]);
        let Commands::Smooth { settings, .. } = cli.command else {
            panic!("expected smooth command");
        };

        let mut config = Config::default();
        settings.apply(&mut config);
        assert_eq!(config.interpolation.max_interpolation_frames, 10);
        assert!(!config.interpolation.strict_consonant_lock);
        assert!(config.interpolation.enable_interpolation);
        assert_eq!(config.depth_policy, DepthPolicy::TempoAdaptive);
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = Config::default();
        SettingsArgs::default().apply(&mut config);
        assert_eq!(config, Config::default());
    }
}
