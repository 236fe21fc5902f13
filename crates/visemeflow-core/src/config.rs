//! Configuration management for VisemeFlow

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::filter::MAX_INTERPOLATION_FRAMES;
use crate::viseme::{resolve_channel, VisemeClass, VisemeClassification, VisemePriority};

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("min_hold_frames must be at least 1")]
    ZeroMinHoldFrames,

    #[error("chunk_ms must be at least 1")]
    ZeroChunkMs,

    #[error("unknown viseme channel '{0}' (expected an index or an OVR name such as 'PP' or 'aa')")]
    UnknownChannel(String),

    #[error("priority for channel {channel} must be in (0, 1], got {weight}")]
    InvalidPriority { channel: usize, weight: f32 },
}

/// How the smoothing depth is chosen for an utterance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DepthPolicy {
    /// Block clustering and smoothing share the configured depth
    #[default]
    Fixed,
    /// Depth follows the speech tempo; block clustering is skipped
    TempoAdaptive,
}

impl DepthPolicy {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::TempoAdaptive => "tempo-adaptive",
        }
    }
}

impl std::str::FromStr for DepthPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(Self::Fixed),
            "tempo-adaptive" | "tempo" | "adaptive" => Ok(Self::TempoAdaptive),
            other => Err(format!("unknown depth policy '{other}' (fixed, tempo-adaptive)")),
        }
    }
}

/// Per-invocation smoothing settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterpolationSettings {
    /// Run the temporal smoother
    pub enable_interpolation: bool,
    /// Block size and look-back depth (clamped to 1..=24)
    pub max_interpolation_frames: u32,
    /// Keep strong consonants from being diluted by smoothing
    pub strict_consonant_lock: bool,
    /// Shortest activation (in frames) that survives the hold filter
    pub min_hold_frames: usize,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            enable_interpolation: true,
            max_interpolation_frames: 6,
            strict_consonant_lock: true,
            min_hold_frames: 2,
        }
    }
}

impl InterpolationSettings {
    /// Effective block size / window depth shared by clustering and smoothing
    pub fn interpolation_frames(&self) -> usize {
        (self.max_interpolation_frames as usize).clamp(1, MAX_INTERPOLATION_FRAMES)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_hold_frames == 0 {
            return Err(ConfigError::ZeroMinHoldFrames);
        }
        Ok(())
    }
}

/// Audio input settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioOptions {
    /// Duration of the chunk handed to the classifier per frame
    pub chunk_ms: u32,
    /// Internal buffer size hint passed to the classifier
    pub buffer_size: usize,
    /// Assume 44.1kHz 16-bit stereo when the WAV header cannot be parsed
    pub fallback_on_bad_header: bool,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            chunk_ms: 10,
            buffer_size: 4096,
            fallback_on_bad_header: false,
        }
    }
}

/// Overrides for the channel tables.
///
/// Keys are channel indices ("7") or OVR names ("SS").
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct VisemeTables {
    /// Start from empty tables instead of the OVR defaults
    pub replace_defaults: bool,
    pub classification: BTreeMap<String, VisemeClass>,
    pub priority: BTreeMap<String, f32>,
}

impl VisemeTables {
    /// Build the classification table, overrides applied on top of the defaults
    pub fn classification(&self) -> Result<VisemeClassification, ConfigError> {
        let mut table = if self.replace_defaults {
            VisemeClassification::empty()
        } else {
            VisemeClassification::ovr_default()
        };
        for (key, class) in &self.classification {
            table.set(resolve_channel(key)?, *class);
        }
        Ok(table)
    }

    /// Build the priority table, overrides applied on top of the defaults
    pub fn priority(&self) -> Result<VisemePriority, ConfigError> {
        let mut table = if self.replace_defaults {
            VisemePriority::uniform()
        } else {
            VisemePriority::ovr_default()
        };
        for (key, weight) in &self.priority {
            table.set(resolve_channel(key)?, *weight)?;
        }
        Ok(table)
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Smoothing depth policy
    pub depth_policy: DepthPolicy,
    /// Smoothing settings
    pub interpolation: InterpolationSettings,
    /// Audio input options
    pub audio: AudioOptions,
    /// Channel table overrides
    pub tables: VisemeTables,
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load and validate a specific config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {:?}", path))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&str>) -> Result<()> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "visemeflow", "visemeflow")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Check every value the pipeline depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interpolation.validate()?;
        if self.audio.chunk_ms == 0 {
            return Err(ConfigError::ZeroChunkMs);
        }
        self.tables.classification()?;
        self.tables.priority()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_frames_clamped() {
        let mut settings = InterpolationSettings::default();
        assert_eq!(settings.interpolation_frames(), 6);

        settings.max_interpolation_frames = 0;
        assert_eq!(settings.interpolation_frames(), 1);

        settings.max_interpolation_frames = 100;
        assert_eq!(settings.interpolation_frames(), 24);
    }

    #[test]
    fn test_validate_rejects_zero_hold() {
        let mut config = Config::default();
        config.interpolation.min_hold_frames = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinHoldFrames));
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let mut config = Config::default();
        config.audio.chunk_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkMs));
    }

    #[test]
    fn test_table_overrides() {
        let mut tables = VisemeTables::default();
        tables.classification.insert("aa".into(), VisemeClass::Consonant);
        tables.priority.insert("0".into(), 0.2);

        let classification = tables.classification().unwrap();
        assert!(classification.is_consonant(10));
        assert!(classification.is_consonant(1), "defaults kept");

        let priority = tables.priority().unwrap();
        assert_eq!(priority.weight(0), 0.2);
        assert_eq!(priority.weight(12), 0.5);
    }

    #[test]
    fn test_replace_defaults_starts_empty() {
        let tables = VisemeTables {
            replace_defaults: true,
            ..Default::default()
        };
        assert!(!tables.classification().unwrap().is_consonant(1));
        assert_eq!(tables.priority().unwrap().weight(12), 1.0);
    }

    #[test]
    fn test_bad_priority_key_rejected() {
        let mut config = Config::default();
        config.tables.priority.insert("nope".into(), 0.5);
        assert!(matches!(config.validate(), Err(ConfigError::UnknownChannel(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            depth_policy = "tempo-adaptive"

            [interpolation]
            max_interpolation_frames = 8

            [tables.priority]
            SS = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.depth_policy, DepthPolicy::TempoAdaptive);
        assert_eq!(config.interpolation.max_interpolation_frames, 8);
        assert_eq!(config.interpolation.min_hold_frames, 2);
        assert!(config.interpolation.strict_consonant_lock);
        assert_eq!(config.audio.chunk_ms, 10);
        assert_eq!(config.tables.priority().unwrap().weight(7), 0.9);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let path_str = path.to_str().unwrap();

        let mut config = Config::default();
        config.interpolation.enable_interpolation = false;
        config.tables.classification.insert("RR".into(), VisemeClass::Vowel);
        config.save(Some(path_str)).unwrap();

        let loaded = Config::load(Some(path_str)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_depth_policy_from_str() {
        assert_eq!("fixed".parse::<DepthPolicy>(), Ok(DepthPolicy::Fixed));
        assert_eq!("Tempo_Adaptive".parse::<DepthPolicy>(), Ok(DepthPolicy::TempoAdaptive));
        assert!("bogus".parse::<DepthPolicy>().is_err());
    }
}
