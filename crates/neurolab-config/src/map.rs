// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Flat string-keyed configuration map
//!
//! External collaborators hand settings over as loose key/value pairs. Getters
//! never fail: an absent or malformed entry yields the caller's default.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TrainingSection;

/// A primitive configuration entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<usize> for ConfigValue {
    fn from(i: usize) -> Self {
        ConfigValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<u64> for ConfigValue {
    fn from(i: u64) -> Self {
        ConfigValue::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ConfigValue {
    fn from(x: f64) -> Self {
        ConfigValue::Float(x)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Text(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Text(s)
    }
}

/// Flat map of configuration primitives with lenient typed getters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap {
    entries: BTreeMap<String, ConfigValue>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.entries.iter()
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        match self.entries.get(key) {
            Some(ConfigValue::Float(x)) => *x,
            Some(ConfigValue::Int(i)) => *i as f64,
            Some(ConfigValue::Text(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.entries.get(key) {
            Some(ConfigValue::Int(i)) => usize::try_from(*i).unwrap_or(default),
            Some(ConfigValue::Float(x)) if x.is_finite() && *x >= 0.0 && x.fract() == 0.0 => {
                *x as usize
            }
            Some(ConfigValue::Text(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_u64(&self, key: &str, default: u64) -> u64 {
        match self.entries.get(key) {
            Some(ConfigValue::Int(i)) => u64::try_from(*i).unwrap_or(default),
            Some(ConfigValue::Text(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.entries.get(key) {
            Some(ConfigValue::Bool(b)) => *b,
            Some(ConfigValue::Int(i)) => *i != 0,
            Some(ConfigValue::Text(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => true,
                "false" | "no" | "0" | "off" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// Text entries as-is; other primitives are rendered with `Display`
    pub fn get_str(&self, key: &str, default: &str) -> String {
        match self.entries.get(key) {
            Some(value) => value.to_string(),
            None => default.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<ConfigValue>> FromIterator<(K, V)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<&TrainingSection> for ConfigMap {
    fn from(section: &TrainingSection) -> Self {
        ConfigMap::new()
            .with("learning_rate", section.learning_rate)
            .with("max_iteration", section.max_iteration)
            .with("epsilon", section.epsilon)
            .with("check_threshold", section.check_threshold)
            .with("learn_bias", section.learn_bias)
            .with("learning_mode", section.learning_mode.as_str())
            .with("batch", section.batch)
            .with("resample", section.resample.as_str())
            .with("random_z_data", section.random_z_data)
            .with("seed", section.seed)
    }
}
