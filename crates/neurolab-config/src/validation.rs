// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem is collected and reported together.

use std::str::FromStr;

use neurolab_neural::ActivationKind;

use crate::types::{LEARNING_MODES, RESAMPLE_STRATEGIES, RIB_LAYOUTS};
use crate::{ConfigError, ConfigResult, NeurolabConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    InvalidValue { field: String, reason: String },
    UnknownName { field: String, name: String, allowed: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
            Self::UnknownName {
                field,
                name,
                allowed,
            } => {
                write!(f, "Unknown {} '{}' (expected one of: {})", field, name, allowed)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &NeurolabConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation problem in `config`, in section order
pub fn collect_errors(config: &NeurolabConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_training(config, &mut errors);
    validate_topology(config, &mut errors);
    validate_recurrent(config, &mut errors);
    errors
}

fn validate_training(config: &NeurolabConfig, errors: &mut Vec<ConfigValidationError>) {
    let training = &config.training;

    if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "training.learning_rate".to_string(),
            reason: format!("must be finite and > 0, got {}", training.learning_rate),
        });
    }
    if !(training.epsilon >= 0.0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "training.epsilon".to_string(),
            reason: format!("must be >= 0, got {}", training.epsilon),
        });
    }
    check_name(
        "training.learning_mode",
        &training.learning_mode,
        LEARNING_MODES,
        errors,
    );
    check_name(
        "training.resample",
        &training.resample,
        RESAMPLE_STRATEGIES,
        errors,
    );
}

fn validate_topology(config: &NeurolabConfig, errors: &mut Vec<ConfigValidationError>) {
    let topology = &config.topology;

    check_activation("topology.hidden_activation", &topology.hidden_activation, errors);
    check_activation("topology.output_activation", &topology.output_activation, errors);

    if topology.hidden_layers.iter().any(|&size| size == 0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "topology.hidden_layers".to_string(),
            reason: "layer sizes must be > 0".to_string(),
        });
    }
    if topology.gate_count != 1 && topology.gate_count != 4 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "topology.gate_count".to_string(),
            reason: format!("must be 1 or 4, got {}", topology.gate_count),
        });
    }
    if !topology.weight_range.is_finite() || topology.weight_range < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "topology.weight_range".to_string(),
            reason: format!("must be finite and >= 0, got {}", topology.weight_range),
        });
    }
}

fn validate_recurrent(config: &NeurolabConfig, errors: &mut Vec<ConfigValidationError>) {
    let recurrent = &config.recurrent;

    if recurrent.states == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "recurrent.states".to_string(),
            reason: "must be >= 1".to_string(),
        });
    }
    check_name("recurrent.layout", &recurrent.layout, RIB_LAYOUTS, errors);
    if !recurrent.aux_activation.is_empty() {
        check_activation("recurrent.aux_activation", &recurrent.aux_activation, errors);
    }
}

fn check_name(field: &str, name: &str, allowed: &[&str], errors: &mut Vec<ConfigValidationError>) {
    if !allowed.contains(&name.trim().to_lowercase().as_str()) {
        errors.push(ConfigValidationError::UnknownName {
            field: field.to_string(),
            name: name.to_string(),
            allowed: allowed.join(", "),
        });
    }
}

fn check_activation(field: &str, name: &str, errors: &mut Vec<ConfigValidationError>) {
    if ActivationKind::from_str(name).is_err() {
        errors.push(ConfigValidationError::UnknownName {
            field: field.to_string(),
            name: name.to_string(),
            allowed: "identity, relu, leaky_relu, sigmoid, tanh, softplus, affine".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_default_config() {
        assert!(validate_config(&NeurolabConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = NeurolabConfig::default();
        config.training.learning_rate = 0.0;
        config.training.epsilon = -1.0;
        config.topology.hidden_activation = "swish".to_string();
        config.topology.gate_count = 3;
        config.recurrent.states = 0;

        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 5);

        let err = validate_config(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("training.learning_rate"));
        assert!(message.contains("swish"));
        assert!(message.contains("recurrent.states"));
    }

    #[test]
    fn test_nan_learning_rate_rejected() {
        let mut config = NeurolabConfig::default();
        config.training.learning_rate = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_unknown_layout_and_mode() {
        let mut config = NeurolabConfig::default();
        config.recurrent.layout = "diagonal".to_string();
        config.training.learning_mode = "reverse".to_string();
        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| matches!(e, ConfigValidationError::UnknownName { .. })));
    }
}
