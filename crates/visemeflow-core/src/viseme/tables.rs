//! Channel classification and priority tables
//!
//! Both tables are configuration: they describe the classifier's channel
//! contract rather than anything the pipeline computes. The built-in
//! defaults follow the 15-channel OVR layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Number of channels in the OVR viseme layout
pub const OVR_VISEME_COUNT: usize = 15;

/// OVR channel names, indexed by channel
pub const OVR_VISEME_NAMES: [&str; OVR_VISEME_COUNT] = [
    "sil", "PP", "FF", "TH", "DD", "kk", "CH", "SS", "nn", "RR", "aa", "E", "ih", "oh", "ou",
];

/// OVR name for a channel index
pub fn viseme_name(channel: usize) -> Option<&'static str> {
    OVR_VISEME_NAMES.get(channel).copied()
}

/// Resolve a table key to a channel index.
///
/// Accepts either a numeric index ("7") or an OVR name ("SS", case-insensitive).
pub fn resolve_channel(key: &str) -> Result<usize, ConfigError> {
    let key = key.trim();
    if let Ok(index) = key.parse::<usize>() {
        return Ok(index);
    }
    OVR_VISEME_NAMES
        .iter()
        .position(|name| name.eq_ignore_ascii_case(key))
        .ok_or_else(|| ConfigError::UnknownChannel(key.to_string()))
}

/// Phonetic class of a viseme channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisemeClass {
    Vowel,
    Consonant,
    #[default]
    Other,
}

impl VisemeClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Vowel => "vowel",
            Self::Consonant => "consonant",
            Self::Other => "other",
        }
    }
}

/// Channel → [`VisemeClass`]; unmapped channels are [`VisemeClass::Other`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisemeClassification {
    classes: BTreeMap<usize, VisemeClass>,
}

impl VisemeClassification {
    /// Empty table: every channel is `Other`, so consonant lock never fires
    pub fn empty() -> Self {
        Self::default()
    }

    /// OVR layout: PP..RR are consonants, aa..ou are vowels
    pub fn ovr_default() -> Self {
        let mut table = Self::empty();
        for channel in 1..=9 {
            table.set(channel, VisemeClass::Consonant);
        }
        for channel in 10..=14 {
            table.set(channel, VisemeClass::Vowel);
        }
        table
    }

    pub fn set(&mut self, channel: usize, class: VisemeClass) {
        self.classes.insert(channel, class);
    }

    pub fn class_of(&self, channel: usize) -> VisemeClass {
        self.classes.get(&channel).copied().unwrap_or_default()
    }

    pub fn is_consonant(&self, channel: usize) -> bool {
        self.class_of(channel) == VisemeClass::Consonant
    }

    /// Explicitly mapped channels in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, VisemeClass)> + '_ {
        self.classes.iter().map(|(&c, &k)| (c, k))
    }
}

impl FromIterator<(usize, VisemeClass)> for VisemeClassification {
    fn from_iter<I: IntoIterator<Item = (usize, VisemeClass)>>(iter: I) -> Self {
        Self {
            classes: iter.into_iter().collect(),
        }
    }
}

/// Channel → selection weight in (0, 1]; unmapped channels weigh 1.0
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisemePriority {
    weights: BTreeMap<usize, f32>,
}

impl VisemePriority {
    /// Every channel weighs 1.0
    pub fn uniform() -> Self {
        Self::default()
    }

    /// Weights favoring phonetically salient OVR visemes
    pub fn ovr_default() -> Self {
        let weights = [
            (10, 1.0), // aa
            (11, 0.6), // E
            (12, 0.5), // ih
            (13, 0.9), // oh
            (14, 1.0), // ou
            (1, 0.9),  // PP
            (2, 0.7),  // FF
            (3, 0.6),  // TH
            (4, 0.7),  // DD
            (5, 0.7),  // kk
            (6, 0.8),  // CH
            (7, 0.6),  // SS
            (8, 0.7),  // nn
            (9, 0.9),  // RR
        ];
        Self {
            weights: weights.into_iter().collect(),
        }
    }

    /// Build a table from `(channel, weight)` pairs, validating every weight
    pub fn from_weights<I>(weights: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (usize, f32)>,
    {
        let mut table = Self::uniform();
        for (channel, weight) in weights {
            table.set(channel, weight)?;
        }
        Ok(table)
    }

    /// Set a channel weight, rejecting values outside (0, 1]
    pub fn set(&mut self, channel: usize, weight: f32) -> Result<(), ConfigError> {
        if !(weight > 0.0 && weight <= 1.0) {
            return Err(ConfigError::InvalidPriority { channel, weight });
        }
        self.weights.insert(channel, weight);
        Ok(())
    }

    pub fn weight(&self, channel: usize) -> f32 {
        self.weights.get(&channel).copied().unwrap_or(1.0)
    }

    /// Explicitly weighted channels in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ovr_classification() {
        let table = VisemeClassification::ovr_default();
        assert_eq!(table.class_of(0), VisemeClass::Other);
        assert_eq!(table.class_of(1), VisemeClass::Consonant);
        assert_eq!(table.class_of(9), VisemeClass::Consonant);
        assert_eq!(table.class_of(10), VisemeClass::Vowel);
        assert_eq!(table.class_of(14), VisemeClass::Vowel);
        assert_eq!(table.class_of(99), VisemeClass::Other);
    }

    #[test]
    fn test_priority_defaults_to_one() {
        let priority = VisemePriority::ovr_default();
        assert_eq!(priority.weight(0), 1.0, "sil is unmapped");
        assert_eq!(priority.weight(12), 0.5);
        assert_eq!(priority.weight(40), 1.0);
        assert_eq!(VisemePriority::uniform().weight(7), 1.0);
    }

    #[test]
    fn test_priority_rejects_out_of_range() {
        let mut priority = VisemePriority::uniform();
        assert!(priority.set(3, 0.0).is_err());
        assert!(priority.set(3, 1.5).is_err());
        assert!(priority.set(3, f32::NAN).is_err());
        assert!(priority.set(3, 1.0).is_ok());
        assert!(priority.set(3, 0.25).is_ok());
        assert_eq!(priority.weight(3), 0.25);
    }

    #[test]
    fn test_from_weights_validates() {
        let priority = VisemePriority::from_weights([(1, 0.5), (4, 1.0)]).unwrap();
        assert_eq!(priority.weight(1), 0.5);
        assert_eq!(priority.weight(2), 1.0);
        assert!(matches!(
            VisemePriority::from_weights([(1, 0.5), (3, 2.0)]),
            Err(ConfigError::InvalidPriority { channel: 3, .. })
        ));
    }

    #[test]
    fn test_resolve_channel_by_name_or_index() {
        assert_eq!(resolve_channel("SS").unwrap(), 7);
        assert_eq!(resolve_channel("ss").unwrap(), 7);
        assert_eq!(resolve_channel("aa").unwrap(), 10);
        assert_eq!(resolve_channel("12").unwrap(), 12);
        assert!(resolve_channel("zz").is_err());
    }

    #[test]
    fn test_viseme_name() {
        assert_eq!(viseme_name(0), Some("sil"));
        assert_eq!(viseme_name(14), Some("ou"));
        assert_eq!(viseme_name(15), None);
    }
}
