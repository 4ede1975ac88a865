//! State Adaptor Library
//!
//! Converts backend-agnostic module steps ("install package X", "manage file
//! Y") into dependency-ordered state documents for a declarative
//! configuration-management backend.
//!
//! ```no_run
//! use state_adaptor::{Converter, ParameterSet, Value};
//!
//! let converter = Converter::builtin();
//! let mut params = ParameterSet::new();
//! params.insert("name".into(), Value::strings(["nginx"]));
//! let documents = converter.convert("1", "linux.apt.package", &params, "ubuntu")?;
//! assert_eq!(documents.len(), 1);
//! # Ok::<(), state_adaptor::ConvertError>(())
//! ```

pub mod cli;
pub mod config_file;
pub mod converter;
pub mod document;
pub mod error;
pub mod logic;
pub mod plan;
pub mod registry;
pub mod stage;
pub mod types;
pub mod value;

// Re-export main types for convenience
pub use config_file::AdaptorConfig;
pub use converter::Converter;
pub use document::{Document, DocumentMap, Edge, Scope};
pub use error::{AdaptorError, ConvertError, ErrorKind, RegistryError};
pub use plan::{Component, PlanStep, StatePlan, StepOutcome, StepResult, convert_plan};
pub use registry::{ModuleSchema, Prerequisite, Registry, SchemaBuilder, Trigger, TriggerAttribute};
pub use stage::{ConversionContext, ConversionStage};
pub use types::{PackageManager, Platform, ResourceType, SshKeyType};
pub use value::{Addin, ParameterSet, Value};

// Pipeline stages
pub use logic::builder::{StateBuckets, StateBuilder, StateHandler};
pub use logic::expander::expand;
pub use logic::mapper::map_attributes;
pub use logic::tag::make_tag;
