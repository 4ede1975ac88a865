use clap::{ArgGroup, Parser, Subcommand};
use std::path::PathBuf;

/// State Adaptor - converts module steps into configuration-management states
#[derive(Parser)]
#[command(name = "state-adaptor")]
#[command(about = "Convert module steps into dependency-ordered state documents")]
#[command(version)]
pub struct Cli {
    /// Log pipeline stages at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pretty-print generated JSON
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Path to an adaptor configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a single step
    #[command(group(ArgGroup::new("parameters").args(["params", "params_json"])))]
    Convert {
        /// Step id used in document tags
        #[arg(short, long)]
        step: String,

        /// Module id (e.g. linux.apt.package)
        #[arg(short, long)]
        module: String,

        /// Target platform (centos, redhat, debian, ubuntu, amazon)
        #[arg(short, long)]
        platform: Option<String>,

        /// JSON file holding the step parameters
        #[arg(long)]
        params: Option<PathBuf>,

        /// Step parameters as inline JSON
        #[arg(long)]
        params_json: Option<String>,

        /// Registry file replacing the built-in module table
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },
    /// Convert every step of a plan file
    Plan {
        /// Path to the plan file
        plan: PathBuf,

        /// Registry file replacing the built-in module table
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },
    /// List the modules of a registry
    Modules {
        /// Registry file replacing the built-in module table
        #[arg(short, long)]
        registry: Option<PathBuf>,
    },
    /// Validate a registry file
    ValidateRegistry {
        /// Path to the registry file to validate
        registry: PathBuf,
    },
}
