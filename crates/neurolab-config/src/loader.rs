// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, NeurolabConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "neurolab.toml";

/// Find the neurolab configuration file
///
/// Search order:
/// 1. `NEUROLAB_CONFIG_PATH` environment variable
/// 2. Current working directory: `./neurolab.toml`
/// 3. Parent directories (up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("NEUROLAB_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by NEUROLAB_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet NEUROLAB_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<NeurolabConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: NeurolabConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `NEUROLAB_LEARNING_RATE` -> `training.learning_rate`
/// - `NEUROLAB_MAX_ITERATION` -> `training.max_iteration`
/// - `NEUROLAB_EPSILON` -> `training.epsilon`
/// - `NEUROLAB_LEARNING_MODE` -> `training.learning_mode`
/// - `NEUROLAB_SEED` -> `training.seed`
/// - `NEUROLAB_LOG_LEVEL` -> `logging.level`
///
/// Values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut NeurolabConfig) {
    let vars: HashMap<String, String> = [
        ("learning_rate", "NEUROLAB_LEARNING_RATE"),
        ("max_iteration", "NEUROLAB_MAX_ITERATION"),
        ("epsilon", "NEUROLAB_EPSILON"),
        ("learning_mode", "NEUROLAB_LEARNING_MODE"),
        ("seed", "NEUROLAB_SEED"),
        ("log_level", "NEUROLAB_LOG_LEVEL"),
    ]
    .iter()
    .filter_map(|(key, var)| env::var(var).ok().map(|value| (key.to_string(), value)))
    .collect();

    apply_cli_overrides(config, &vars);
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - Map of CLI arguments (e.g., `{"learning_rate": "0.5", "batch": "true"}`)
pub fn apply_cli_overrides(config: &mut NeurolabConfig, cli_args: &HashMap<String, String>) {
    let training = &mut config.training;

    if let Some(value) = cli_args.get("learning_rate") {
        if let Ok(rate) = value.trim().parse::<f64>() {
            training.learning_rate = rate;
        }
    }
    if let Some(value) = cli_args.get("max_iteration") {
        if let Ok(max) = value.trim().parse::<usize>() {
            training.max_iteration = max;
        }
    }
    if let Some(value) = cli_args.get("epsilon") {
        if let Ok(epsilon) = value.trim().parse::<f64>() {
            training.epsilon = epsilon;
        }
    }
    if let Some(value) = cli_args.get("learning_mode") {
        training.learning_mode = value.trim().to_lowercase();
    }
    if let Some(value) = cli_args.get("resample") {
        training.resample = value.trim().to_lowercase();
    }
    if let Some(value) = cli_args.get("batch") {
        training.batch = parse_flag(value);
    }
    if let Some(value) = cli_args.get("seed") {
        if let Ok(seed) = value.trim().parse::<u64>() {
            training.seed = seed;
        }
    }
    if let Some(value) = cli_args.get("states") {
        if let Ok(states) = value.trim().parse::<usize>() {
            config.recurrent.states = states;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.trim().to_lowercase();
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: &[&str] = &[
        "NEUROLAB_LEARNING_RATE",
        "NEUROLAB_MAX_ITERATION",
        "NEUROLAB_EPSILON",
        "NEUROLAB_LEARNING_MODE",
        "NEUROLAB_SEED",
        "NEUROLAB_LOG_LEVEL",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom.toml");
        File::create(&config_path).unwrap();

        env::set_var("NEUROLAB_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("NEUROLAB_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        env::set_var(
            "NEUROLAB_CONFIG_PATH",
            dir.path().join("absent.toml").to_str().unwrap(),
        );
        let result = find_config_file();
        env::remove_var("NEUROLAB_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "max_iteration = 50").unwrap();
        writeln!(file, "[topology]").unwrap();
        writeln!(file, "hidden_layers = [4, 2]").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.training.max_iteration, 50);
        assert_eq!(config.topology.hidden_layers, vec![4, 2]);
        assert_eq!(config.training.learning_rate, 0.1);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = NeurolabConfig::default();

        env::set_var("NEUROLAB_LEARNING_RATE", "0.25");
        env::set_var("NEUROLAB_SEED", "42");
        env::set_var("NEUROLAB_EPSILON", "not-a-number");

        apply_environment_overrides(&mut config);
        clear_override_vars();

        assert_eq!(config.training.learning_rate, 0.25);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.training.epsilon, 0.001);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = NeurolabConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("learning_mode".to_string(), "Inverse".to_string());
        cli_args.insert("batch".to_string(), "yes".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.training.learning_mode, "inverse");
        assert!(config.training.batch);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[training]").unwrap();
        writeln!(file, "learning_rate = 0.01").unwrap();
        writeln!(file, "max_iteration = 10").unwrap();

        env::set_var("NEUROLAB_LEARNING_RATE", "0.2");
        env::set_var("NEUROLAB_MAX_ITERATION", "20");

        let mut cli_args = HashMap::new();
        cli_args.insert("learning_rate".to_string(), "0.3".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        clear_override_vars();

        // CLI wins for learning rate, env wins for max_iteration
        assert_eq!(config.training.learning_rate, 0.3);
        assert_eq!(config.training.max_iteration, 20);
    }
}
