//! State Adaptor - Main entry point
//!
//! Generated documents go to stdout; logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use state_adaptor::cli::{Cli, Commands};
use state_adaptor::{AdaptorConfig, Converter, Registry, StatePlan, Value, convert_plan};

/// Initialize the tracing subscriber; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!("CLI arguments parsed");

    let config = match &cli.config {
        Some(path) => {
            let config = AdaptorConfig::load_from_file(path)?;
            config.validate()?;
            config
        }
        None => AdaptorConfig::default(),
    };
    let pretty = cli.pretty || config.pretty;

    match cli.command {
        Commands::Convert {
            step,
            module,
            platform,
            params,
            params_json,
            registry,
        } => {
            let converter = load_converter(&config, registry)?;
            let platform = platform
                .or_else(|| config.platform.map(|p| p.to_string()))
                .context("No platform given; pass --platform or set it in the config file")?;
            let parameters = read_parameters(params.as_deref(), params_json.as_deref())?;

            match converter.convert_value(&step, &module, &parameters, &platform) {
                Ok(documents) => print_json(&documents, pretty)?,
                Err(e) => {
                    eprintln!("✗ Conversion failed ({}): {}", e.kind(), e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Plan { plan, registry } => {
            let converter = load_converter(&config, registry)?;
            let plan = StatePlan::from_file(&plan)
                .with_context(|| format!("Failed to load plan from {:?}", plan))?;
            info!(os_type = %plan.os_type, steps = plan.step_count(), "converting plan");

            let outcomes = convert_plan(&converter, &plan);
            print_json(&outcomes, pretty)?;

            let failed = outcomes.iter().filter(|o| !o.is_converted()).count();
            if failed > 0 {
                error!(failed, "plan conversion had failing steps");
                eprintln!("✗ {} of {} steps failed", failed, outcomes.len());
                std::process::exit(1);
            }
        }
        Commands::Modules { registry } => {
            let converter = load_converter(&config, registry)?;
            for schema in converter.registry().all() {
                println!(
                    "{:<24} {:<16} {}",
                    schema.id,
                    schema.resource_type,
                    schema.states.join(", ")
                );
            }
        }
        Commands::ValidateRegistry { registry } => {
            info!("Validating registry file: {:?}", registry);
            match Registry::from_file(&registry) {
                Ok(loaded) => {
                    println!("✓ Registry is valid: {} modules", loaded.len());
                }
                Err(e) => {
                    error!("Registry validation failed: {}", e);
                    eprintln!("✗ Registry validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

/// Build the converter; a `--registry` flag wins over the config file
fn load_converter(config: &AdaptorConfig, registry: Option<PathBuf>) -> Result<Converter> {
    match registry {
        Some(path) => {
            let config = AdaptorConfig {
                registry: Some(path),
                ..config.clone()
            };
            config.validate()?;
            config.load_converter()
        }
        None => config.load_converter(),
    }
}

/// Read step parameters from a file or inline JSON; none means an empty mapping
fn read_parameters(file: Option<&Path>, inline: Option<&str>) -> Result<Value> {
    let json = match (file, inline) {
        (Some(path), _) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters from {:?}", path))?,
        (None, Some(json)) => json.to_string(),
        (None, None) => return Ok(Value::Map(Default::default())),
    };
    serde_json::from_str(&json).context("Failed to parse parameters JSON")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    let json = json.context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
