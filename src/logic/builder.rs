//! State Builder
//!
//! Buckets a mapped attribute set by target state. Modules without a
//! registered handler get a single bucket under their default state; modules
//! with special semantics (package lists, scm, paths, commands, ...) are
//! dispatched to a handler keyed by module id.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::handlers;
use crate::error::ConvertError;
use crate::registry::ModuleSchema;
use crate::value::Addin;

/// Attribute sets keyed by target state name
pub type StateBuckets = BTreeMap<String, Addin>;

/// Module-specific transform from a mapped attribute set to state buckets
pub type StateHandler = fn(&ModuleSchema, Addin) -> Result<StateBuckets, ConvertError>;

/// Put the whole attribute set under the schema's default state
pub fn default_buckets(schema: &ModuleSchema, addin: Addin) -> StateBuckets {
    let mut buckets = StateBuckets::new();
    buckets.insert(schema.default_state().to_string(), addin);
    buckets
}

/// Handler table keyed by module id
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    handlers: HashMap<String, StateHandler>,
}

impl StateBuilder {
    /// Create a builder with no handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a module id, replacing any existing one
    pub fn register(&mut self, module: impl Into<String>, handler: StateHandler) {
        self.handlers.insert(module.into(), handler);
    }

    /// Look up the handler for a module id
    pub fn handler(&self, module: &str) -> Option<StateHandler> {
        self.handlers.get(module).copied()
    }

    /// Create a builder with the handlers of every built-in module
    pub fn with_builtin_handlers() -> Self {
        let mut builder = Self::new();

        for module in ["linux.apt.package", "linux.yum.package"] {
            builder.register(module, handlers::system_packages);
        }
        builder.register("common.npm.package", handlers::npm_packages);
        for module in ["common.pip.package", "common.gem.package"] {
            builder.register(module, handlers::pinned_packages);
        }
        for module in ["common.git", "common.svn", "common.hg"] {
            builder.register(module, handlers::source_control);
        }
        for module in ["linux.apt.repo", "linux.yum.repo"] {
            builder.register(module, handlers::repo_file);
        }
        builder.register("common.gem.source", handlers::gem_source);
        for module in ["common.ssh.auth", "common.ssh.known_host"] {
            builder.register(module, handlers::ssh_key);
        }
        builder.register("linux.dir", handlers::directory);
        for module in ["linux.file", "linux.symlink"] {
            builder.register(module, handlers::path_entry);
        }
        builder.register("linux.cmd", handlers::command);
        for module in ["linux.user", "linux.group"] {
            builder.register(module, handlers::account);
        }
        builder.register("linux.mount", handlers::mount);
        for module in ["linux.lvm.vg", "linux.lvm.lv"] {
            builder.register(module, handlers::lvm_volume);
        }

        builder
    }

    /// Bucket an attribute set by target state.
    ///
    /// # Errors
    ///
    /// `BuildFailure` if the handler fails or no bucket is produced.
    pub fn build_states(
        &self,
        schema: &ModuleSchema,
        addin: Addin,
    ) -> Result<StateBuckets, ConvertError> {
        let buckets = match self.handler(&schema.id) {
            Some(handler) => handler(schema, addin)?,
            None => default_buckets(schema, addin),
        };

        if buckets.is_empty() {
            return Err(ConvertError::build_failure(
                &schema.id,
                "no state bucket produced",
            ));
        }

        debug!(
            module = %schema.id,
            states = ?buckets.keys().collect::<Vec<_>>(),
            "built state buckets"
        );
        Ok(buckets)
    }
}
