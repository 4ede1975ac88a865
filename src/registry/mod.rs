//! Module Schema Registry
//!
//! The registry is the read-only table describing every module the adaptor
//! can convert: how raw attribute names rename to backend keys, which target
//! states are valid (the first one is the default), the backend resource type,
//! static prerequisites and downstream triggers.
//!
//! # Registry Format
//!
//! Registries can be loaded from JSON with the following structure:
//! ```json
//! {
//!   "modules": [
//!     {
//!       "id": "common.git",
//!       "type": "git",
//!       "attributes": { "path": "target", "repo": "name" },
//!       "states": ["latest", "present"],
//!       "require": [
//!         { "module": "linux.apt.package", "parameters": { "name": ["git"] } }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Every registry is validated before use: prerequisite and trigger modules
//! must exist, prerequisites must not form a cycle, and rename tables must be
//! one-to-one so mapped attributes can be turned back into raw ones.

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

use crate::error::RegistryError;
use crate::types::{PackageManager, ResourceType};
use crate::value::{Addin, ParameterSet, Value};

/// A module that must be converted and run before the declaring module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prerequisite {
    /// Module id of the prerequisite
    pub module: String,

    /// Raw parameters passed to the prerequisite's own conversion
    #[serde(default)]
    pub parameters: ParameterSet,
}

/// One attribute of a trigger document.
///
/// `source` is either a raw parameter name of the declaring module, whose
/// value is copied, or a template containing `$token` words that are replaced
/// by the matching raw parameter values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerAttribute {
    pub source: String,
    pub target: String,
}

/// A document generated to run after the declaring module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    /// Module id of the triggered document
    pub module: String,

    /// Attribute templates of the triggered document
    pub attributes: Vec<TriggerAttribute>,
}

/// Definition of one convertible module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSchema {
    /// Dotted module id, e.g. `linux.apt.package`
    pub id: String,

    /// Backend resource type keyword
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Raw attribute name to backend attribute key
    pub attributes: BTreeMap<String, String>,

    /// Valid target states; the first is the default
    pub states: Vec<String>,

    /// Package manager this module is bound to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<PackageManager>,

    /// Static prerequisites
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<Prerequisite>,

    /// Downstream triggers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require_in: Vec<Trigger>,
}

impl ModuleSchema {
    /// Create a new schema builder
    pub fn builder(id: impl Into<String>, resource_type: ResourceType) -> SchemaBuilder {
        SchemaBuilder::new(id, resource_type)
    }

    /// The default target state
    pub fn default_state(&self) -> &str {
        self.states.first().map(String::as_str).unwrap_or_default()
    }

    /// Whether `state` is one of this module's valid states
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }

    /// Backend key for a raw attribute name
    pub fn backend_key(&self, raw: &str) -> Option<&str> {
        self.attributes.get(raw).map(String::as_str)
    }

    /// Raw attribute name for a backend key
    pub fn raw_key(&self, backend: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(_, b)| b.as_str() == backend)
            .map(|(raw, _)| raw.as_str())
    }

    /// Restore raw attribute names on a mapped attribute set.
    ///
    /// Keys that are not part of the rename table (added by state handlers)
    /// are dropped. Lists made only of bare names and single `{name: value}`
    /// pairs come back as the `{name: value}` mapping they are mapped from,
    /// with bare names restored to `""`.
    pub fn unmap_attributes(&self, addin: &Addin) -> ParameterSet {
        addin
            .iter()
            .filter_map(|(key, value)| {
                self.raw_key(key)
                    .map(|raw| (raw.to_string(), unmap_value(value)))
            })
            .collect()
    }

    /// Validate the schema on its own (references are checked by the registry)
    fn validate_structure(&self) -> Result<(), RegistryError> {
        if self.states.is_empty() {
            return Err(RegistryError::NoStates {
                module: self.id.clone(),
            });
        }
        if self.attributes.is_empty() {
            return Err(RegistryError::NoAttributes {
                module: self.id.clone(),
            });
        }

        let mut seen = HashSet::new();
        for key in self.attributes.values() {
            if !seen.insert(key) {
                return Err(RegistryError::DuplicateBackendKey {
                    module: self.id.clone(),
                    key: key.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Fold a list of entries back into its `{name: value}` mapping
fn unmap_value(value: &Value) -> Value {
    let Some(entries) = value.as_list() else {
        return value.clone();
    };
    if entries.is_empty() {
        return value.clone();
    }

    let mut restored = BTreeMap::new();
    for entry in entries {
        match entry {
            Value::Str(name) => {
                restored.insert(name.clone(), Value::from(""));
            }
            Value::Map(pair) if pair.len() == 1 => {
                restored.extend(pair.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            _ => return value.clone(),
        }
    }
    if restored.len() != entries.len() {
        return value.clone();
    }
    Value::Map(restored)
}

/// Builder for creating ModuleSchema instances
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    id: String,
    resource_type: ResourceType,
    attributes: BTreeMap<String, String>,
    states: Vec<String>,
    package_manager: Option<PackageManager>,
    require: Vec<Prerequisite>,
    require_in: Vec<Trigger>,
}

impl SchemaBuilder {
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into(),
            resource_type,
            attributes: BTreeMap::new(),
            states: Vec::new(),
            package_manager: None,
            require: Vec::new(),
            require_in: Vec::new(),
        }
    }

    /// Add a raw attribute and its backend key
    pub fn attribute(mut self, raw: impl Into<String>, backend: impl Into<String>) -> Self {
        self.attributes.insert(raw.into(), backend.into());
        self
    }

    /// Set the valid states; the first is the default
    pub fn states(mut self, states: &[&str]) -> Self {
        self.states = states.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Bind the module to a package manager
    pub fn package_manager(mut self, pm: PackageManager) -> Self {
        self.package_manager = Some(pm);
        self
    }

    /// Add a prerequisite with a single raw parameter
    pub fn require(
        mut self,
        module: impl Into<String>,
        attribute: impl Into<String>,
        value: Value,
    ) -> Self {
        let mut parameters = ParameterSet::new();
        parameters.insert(attribute.into(), value);
        self.require.push(Prerequisite {
            module: module.into(),
            parameters,
        });
        self
    }

    /// Add a trigger producing one attribute from a template
    pub fn require_in(
        mut self,
        module: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        let module = module.into();
        let attribute = TriggerAttribute {
            source: source.into(),
            target: target.into(),
        };
        match self.require_in.iter_mut().find(|t| t.module == module) {
            Some(trigger) => trigger.attributes.push(attribute),
            None => self.require_in.push(Trigger {
                module,
                attributes: vec![attribute],
            }),
        }
        self
    }

    /// Build the schema
    pub fn build(self) -> Result<ModuleSchema, RegistryError> {
        let schema = ModuleSchema {
            id: self.id,
            resource_type: self.resource_type,
            attributes: self.attributes,
            states: self.states,
            package_manager: self.package_manager,
            require: self.require,
            require_in: self.require_in,
        };
        schema.validate_structure()?;
        Ok(schema)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RegistryFile {
    modules: Vec<ModuleSchema>,
}

/// Registry of module schemas
#[derive(Debug, Clone, Default)]
pub struct Registry {
    schemas: BTreeMap<String, ModuleSchema>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any schema with the same id
    pub fn register(&mut self, schema: ModuleSchema) {
        self.schemas.insert(schema.id.clone(), schema);
    }

    /// Look up a schema by module id
    pub fn get(&self, module: &str) -> Option<&ModuleSchema> {
        self.schemas.get(module)
    }

    /// Whether a module id is registered
    pub fn contains(&self, module: &str) -> bool {
        self.schemas.contains_key(module)
    }

    /// All registered schemas, ordered by module id
    pub fn all(&self) -> impl Iterator<Item = &ModuleSchema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Create the validated registry of built-in modules
    pub fn with_builtin_modules() -> Self {
        let mut registry = Self::new();
        for schema in builtin::schemas() {
            registry.register(schema);
        }
        registry
    }

    /// Load and validate a registry from a JSON string
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for schema in file.modules {
            schema.validate_structure()?;
            if registry.contains(&schema.id) {
                return Err(RegistryError::InvalidFormat {
                    reason: format!("Duplicate module: {}", schema.id),
                });
            }
            registry.register(schema);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Load and validate a registry from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize the registry to pretty JSON
    pub fn to_json(&self) -> Result<String, RegistryError> {
        let file = RegistryFile {
            modules: self.schemas.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Validate cross-schema references and reject prerequisite cycles
    pub fn validate(&self) -> Result<(), RegistryError> {
        for schema in self.schemas.values() {
            schema.validate_structure()?;

            let references = schema
                .require
                .iter()
                .map(|r| &r.module)
                .chain(schema.require_in.iter().map(|t| &t.module));
            for reference in references {
                if !self.contains(reference) {
                    return Err(RegistryError::UnknownReference {
                        module: schema.id.clone(),
                        reference: reference.clone(),
                    });
                }
            }
        }

        let mut done = HashSet::new();
        for id in self.schemas.keys() {
            let mut path = Vec::new();
            self.visit(id, &mut path, &mut done)?;
        }

        debug!(modules = self.schemas.len(), "registry validated");
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), RegistryError> {
        if done.contains(id) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|p| *p == id) {
            let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            cycle.push(id.to_string());
            return Err(RegistryError::Cycle { path: cycle });
        }

        path.push(id);
        if let Some(schema) = self.schemas.get(id) {
            for prerequisite in &schema.require {
                self.visit(&prerequisite.module, path, done)?;
            }
        }
        path.pop();
        done.insert(id);
        Ok(())
    }
}
