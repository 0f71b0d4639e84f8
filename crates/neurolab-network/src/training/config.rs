// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Immutable training parameters, read once from a configuration map

use std::fmt;
use std::str::FromStr;

use neurolab_config::{ConfigMap, TrainingSection};
use tracing::warn;

use super::resample::Resample;

/// Which passes a learning step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LearningMode {
    /// Squared error against the record target
    #[default]
    Standard,
    /// Inverse-function error, no target needed
    Inverse,
    /// One standard pass then one inverse pass per record
    Bidirectional,
}

impl LearningMode {
    pub fn runs_standard(self) -> bool {
        matches!(self, LearningMode::Standard | LearningMode::Bidirectional)
    }

    pub fn runs_inverse(self) -> bool {
        matches!(self, LearningMode::Inverse | LearningMode::Bidirectional)
    }
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LearningMode::Standard => "standard",
            LearningMode::Inverse => "inverse",
            LearningMode::Bidirectional => "bidirectional",
        };
        f.write_str(name)
    }
}

impl FromStr for LearningMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" => Ok(LearningMode::Standard),
            "inverse" => Ok(LearningMode::Inverse),
            "bidirectional" => Ok(LearningMode::Bidirectional),
            other => Err(format!("unknown learning mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub learning_rate: f64,
    /// Iteration cap; 0 means no cap
    pub max_iteration: usize,
    /// Termination threshold on the mean output error magnitude
    pub epsilon: f64,
    pub check_threshold: bool,
    pub learn_bias: bool,
    pub mode: LearningMode,
    /// Mean error over the whole sample instead of one step per record
    pub batch: bool,
    pub resample: Resample,
    /// Replace record inputs by seeded uniform noise in [0, 1)
    pub random_z_data: bool,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iteration: 1000,
            epsilon: 0.001,
            check_threshold: true,
            learn_bias: true,
            mode: LearningMode::Standard,
            batch: false,
            resample: Resample::Sequential,
            random_z_data: false,
            seed: 0,
        }
    }
}

impl TrainingConfig {
    pub fn from_section(section: &TrainingSection) -> Self {
        Self::from_map(&ConfigMap::from(section))
    }

    /// Read every recognised key, falling back to the default when a key is
    /// absent or malformed
    pub fn from_map(map: &ConfigMap) -> Self {
        let defaults = Self::default();

        let mut mode = parse_or_default(map, "learning_mode", defaults.mode);
        if map.get_bool("bidirectional_learning", false) {
            mode = LearningMode::Bidirectional;
        } else if map.get_bool("inverse_learning", false) {
            mode = LearningMode::Inverse;
        }

        let learning_rate = map.get_f64("learning_rate", defaults.learning_rate);
        let learning_rate = if learning_rate.is_finite() && learning_rate > 0.0 {
            learning_rate
        } else {
            warn!(
                target: "neurolab::training",
                "[TRAINER] Ignoring learning_rate {}, using {}",
                learning_rate,
                defaults.learning_rate
            );
            defaults.learning_rate
        };

        Self {
            learning_rate,
            max_iteration: map.get_usize("max_iteration", defaults.max_iteration),
            epsilon: map.get_f64("epsilon", defaults.epsilon).max(0.0),
            check_threshold: map.get_bool("check_threshold", defaults.check_threshold),
            learn_bias: map.get_bool("learn_bias", defaults.learn_bias),
            mode,
            batch: map.get_bool("batch", defaults.batch),
            resample: parse_or_default(map, "resample", defaults.resample),
            random_z_data: map.get_bool("random_z_data", defaults.random_z_data),
            seed: map.get_u64("seed", defaults.seed),
        }
    }
}

fn parse_or_default<T>(map: &ConfigMap, key: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    if !map.contains_key(key) {
        return default;
    }
    match map.get_str(key, "").parse() {
        Ok(value) => value,
        Err(e) => {
            warn!(
                target: "neurolab::training",
                "[TRAINER] {} for '{}', using {}",
                e,
                key,
                default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_map() {
        assert_eq!(TrainingConfig::from_map(&ConfigMap::new()), TrainingConfig::default());
    }

    #[test]
    fn test_section_matches_defaults() {
        let config = TrainingConfig::from_section(&TrainingSection::default());
        assert_eq!(config, TrainingConfig::default());
    }

    #[test]
    fn test_map_values_and_fallbacks() {
        let map = ConfigMap::new()
            .with("learning_rate", "0.5")
            .with("max_iteration", 1i64)
            .with("learning_mode", "inverse")
            .with("resample", "warp")
            .with("batch", "yes")
            .with("seed", 9i64);
        let config = TrainingConfig::from_map(&map);
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.max_iteration, 1);
        assert_eq!(config.mode, LearningMode::Inverse);
        assert_eq!(config.resample, Resample::Sequential);
        assert!(config.batch);
        assert_eq!(config.seed, 9);
    }

    #[test]
    fn test_boolean_toggles_override_mode() {
        let map = ConfigMap::new()
            .with("learning_mode", "standard")
            .with("inverse_learning", true);
        assert_eq!(TrainingConfig::from_map(&map).mode, LearningMode::Inverse);

        let map = map.with("bidirectional_learning", "1");
        let mode = TrainingConfig::from_map(&map).mode;
        assert_eq!(mode, LearningMode::Bidirectional);
        assert!(mode.runs_standard() && mode.runs_inverse());
    }

    #[test]
    fn test_non_positive_learning_rate_rejected() {
        let map = ConfigMap::new().with("learning_rate", -1.0).with("epsilon", -0.5);
        let config = TrainingConfig::from_map(&map);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.epsilon, 0.0);
    }
}
