// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! XOR training demo.
//!
//! Loads `neurolab.toml` (or falls back to defaults), trains a
//! 2-hidden-1 network on XOR and prints the learned outputs.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use neurolab::config::{load_config, validate_config, NeurolabConfig};
use neurolab::network::{
    build_recurrent, Network, Record, RecurrentSettings, TopologySettings, Trainer, TrainingConfig,
    TrainingControl, TrainingEvent,
};
use neurolab::observability::{debug_flags_help, init_logging_with_level, parse_debug_flags};
use tracing::{info, warn};

struct Args {
    config: Option<PathBuf>,
    save: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: train_demo [--config <path>] [--save <path>] [--set key=value]...\n\n\
         Keys for --set: learning_rate, max_iteration, epsilon, learning_mode,\n\
         resample, batch, seed, states, log_level\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        save: None,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--save" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.save = Some(PathBuf::from(v));
            }
            "--set" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                let Some((key, value)) = v.split_once('=') else {
                    eprintln!("Expected key=value, got {v}");
                    usage_and_exit();
                };
                parsed.overrides.insert(key.trim().to_string(), value.trim().to_string());
            }
            "-h" | "--help" => usage_and_exit(),
            other if other.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }
    parsed
}

fn xor_records() -> Vec<Record> {
    vec![
        Record::scalar(&[0.0, 0.0], &[0.0]),
        Record::scalar(&[0.0, 1.0], &[1.0]),
        Record::scalar(&[1.0, 0.0], &[1.0]),
        Record::scalar(&[1.0, 1.0], &[0.0]),
    ]
}

fn build_network(config: &NeurolabConfig) -> Result<Network> {
    let topology = TopologySettings::from_section(&config.topology, config.training.seed)?;
    let mut dims = vec![2];
    dims.extend(config.topology.hidden_layers.iter().copied());
    dims.push(1);

    let recurrent = RecurrentSettings::from_section(&config.recurrent)?;
    if recurrent.states > 1 || recurrent.cell.is_some() {
        return Ok(build_recurrent(topology, &recurrent, &dims)?);
    }
    let mut net = Network::new(topology);
    net.initialize(&dims)?;
    Ok(net)
}

fn main() -> Result<()> {
    let args = parse_args();
    let mut flags = parse_debug_flags();

    let loaded = load_config(args.config.as_deref(), Some(&args.overrides));
    let (config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => {
            let mut config = NeurolabConfig::default();
            neurolab::config::apply_environment_overrides(&mut config);
            neurolab::config::apply_cli_overrides(&mut config, &args.overrides);
            (config, Some(e))
        }
    };

    for crate_name in &config.logging.debug_crates {
        flags.enable(crate_name);
    }
    init_logging_with_level(&flags, &config.logging.level)?;
    if let Some(e) = load_error {
        warn!(target: "neurolab::demo", "[DEMO] Using default configuration: {}", e);
    }
    validate_config(&config).context("Invalid configuration")?;

    let mut net = build_network(&config)?;
    let report_every = (config.training.max_iteration / 10).max(1);
    let trainer = Trainer::new(TrainingConfig::from_section(&config.training)).with_listener(Arc::new(
        move |event: &TrainingEvent| {
            if event.iteration % report_every == 0 {
                info!(target: "neurolab::demo", "[DEMO] {}", event.message);
            }
        },
    ));

    let records = xor_records();
    let outcome = trainer.train(&mut net, &records, &TrainingControl::new())?;
    println!(
        "Training finished after {} iterations ({})",
        outcome.iterations, outcome.reason
    );

    for record in &records {
        let output = net.evaluate(&record.input)?;
        let shown: Vec<String> = output
            .iter()
            .map(|v| v.as_scalar().map_or_else(|| format!("{:?}", v), |x| format!("{:.4}", x)))
            .collect();
        println!("{:?} -> [{}]", record.input, shown.join(", "));
    }

    if let Some(path) = args.save {
        net.snapshot()
            .save(&path)
            .with_context(|| format!("Failed to save parameters to {}", path.display()))?;
        println!("Parameters written to {}", path.display());
    }
    Ok(())
}
