//! Plan conversion.
//!
//! A plan is the payload an agent receives for one host: the platform and,
//! per component uid, an ordered list of steps. Converting a plan converts
//! every step independently so one bad step does not hide the others.
//!
//! ```json
//! {
//!   "os_type": "ubuntu",
//!   "component": {
//!     "web": {
//!       "state": [
//!         { "id": "1", "module": "linux.apt.package", "parameter": { "name": { "nginx": "" } } }
//!       ]
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::converter::Converter;
use crate::document::DocumentMap;
use crate::error::{AdaptorError, ErrorKind, Result};
use crate::value::Value;

/// One module step of a component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub module: String,
    #[serde(default)]
    pub parameter: Value,
}

/// Ordered steps of one component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub state: Vec<PlanStep>,
}

/// All steps for one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePlan {
    pub os_type: String,
    #[serde(default)]
    pub component: BTreeMap<String, Component>,
}

impl StatePlan {
    /// Parse a plan from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let plan: Self = serde_json::from_str(json)?;
        if plan.os_type.trim().is_empty() {
            return Err(AdaptorError::general("plan has no os_type"));
        }
        Ok(plan)
    }

    /// Load a plan from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of steps across all components
    pub fn step_count(&self) -> usize {
        self.component.values().map(|c| c.state.len()).sum()
    }
}

/// Result of converting one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Converted { documents: Vec<DocumentMap> },
    Failed { kind: ErrorKind, message: String },
}

/// One converted (or rejected) plan step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    pub uid: String,
    pub step: String,
    pub module: String,
    #[serde(flatten)]
    pub result: StepResult,
}

impl StepOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self.result, StepResult::Converted { .. })
    }
}

/// Convert every step of a plan, components in uid order
pub fn convert_plan(converter: &Converter, plan: &StatePlan) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(plan.step_count());

    for (uid, component) in &plan.component {
        info!(uid = %uid, steps = component.state.len(), "converting component");

        for step in &component.state {
            let result =
                match converter.convert_value(&step.id, &step.module, &step.parameter, &plan.os_type) {
                    Ok(documents) => StepResult::Converted { documents },
                    Err(err) => StepResult::Failed {
                        kind: err.kind(),
                        message: err.to_string(),
                    },
                };
            outcomes.push(StepOutcome {
                uid: uid.clone(),
                step: step.id.clone(),
                module: step.module.clone(),
                result,
            });
        }
    }

    outcomes
}
