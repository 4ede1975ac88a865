//! Converter: the single entry point of the pipeline.
//!
//! `convert` validates the request, then drives mapping, state building,
//! dependency resolution and tagging through [`Converter::compile`], and
//! finally expands version pins. Every call owns its own
//! [`ConversionContext`]; the converter itself is immutable and can be
//! shared across threads.

use tracing::{debug, info, warn};

use crate::document::{Document, DocumentMap, Edge, Scope};
use crate::error::{ConvertError, RegistryError};
use crate::logic::builder::StateBuilder;
use crate::logic::expander::expand;
use crate::logic::mapper::map_attributes;
use crate::logic::resolver::{resolve_require_in, resolve_requires};
use crate::logic::tag::make_tag;
use crate::registry::{ModuleSchema, Registry};
use crate::stage::{ConversionContext, ConversionStage};
use crate::types::Platform;
use crate::value::{ParameterSet, Value};

/// Whether `module` is a dotted name of `[A-Za-z0-9_]` segments
fn is_module_name(module: &str) -> bool {
    !module.is_empty()
        && module.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn edges_to(documents: &DocumentMap) -> Vec<Edge> {
    documents
        .iter()
        .map(|(tag, doc)| Edge::new(doc.resource_type, tag.clone()))
        .collect()
}

/// Converts module steps into state documents
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Registry,
    builder: StateBuilder,
}

impl Converter {
    /// Create a converter over a registry, validating it first.
    ///
    /// # Errors
    ///
    /// Any [`RegistryError`] from [`Registry::validate`].
    pub fn new(registry: Registry) -> Result<Self, RegistryError> {
        registry.validate()?;
        Ok(Self {
            registry,
            builder: StateBuilder::with_builtin_handlers(),
        })
    }

    /// Create a converter over the built-in module table
    pub fn builtin() -> Self {
        Self {
            registry: Registry::with_builtin_modules(),
            builder: StateBuilder::with_builtin_handlers(),
        }
    }

    /// Replace the state handler table
    pub fn with_builder(mut self, builder: StateBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Convert one step.
    ///
    /// Returns the isolated document maps produced by version-pin expansion
    /// followed by the main document map, which is always present.
    ///
    /// # Errors
    ///
    /// A [`ConvertError`] of the kind of the first failure. No documents are
    /// returned on failure.
    pub fn convert(
        &self,
        step: &str,
        module: &str,
        params: &ParameterSet,
        platform: &str,
    ) -> Result<Vec<DocumentMap>, ConvertError> {
        info!(step, module, platform, "converting step");

        let (schema, platform) = self.validate(step, module, platform).inspect_err(|err| {
            warn!(step, module, kind = %err.kind(), "rejected step: {}", err);
        })?;

        let mut ctx = ConversionContext::new(platform);
        match self.run(&mut ctx, step, schema, params) {
            Ok(documents) => {
                info!(
                    step,
                    module,
                    maps = documents.len(),
                    documents = documents.iter().map(|m| m.len()).sum::<usize>(),
                    "converted step"
                );
                Ok(documents)
            }
            Err(err) => {
                ctx.fail();
                warn!(
                    step,
                    module,
                    kind = %err.kind(),
                    failed_at = ?ctx.failed_at(),
                    "conversion failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    /// Convert one step whose parameters are an untyped value.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `params` is not a mapping, otherwise as [`Self::convert`].
    pub fn convert_value(
        &self,
        step: &str,
        module: &str,
        params: &Value,
        platform: &str,
    ) -> Result<Vec<DocumentMap>, ConvertError> {
        match params {
            Value::Map(params) => self.convert(step, module, params, platform),
            other => {
                let err = ConvertError::invalid_input(format!(
                    "parameters of module {} must be a mapping, got {}",
                    module, other
                ));
                warn!(step, module, kind = %err.kind(), "rejected step: {}", err);
                Err(err)
            }
        }
    }

    fn validate<'a>(
        &'a self,
        step: &str,
        module: &str,
        platform: &str,
    ) -> Result<(&'a ModuleSchema, Platform), ConvertError> {
        if step.trim().is_empty() {
            return Err(ConvertError::invalid_input("step id is empty"));
        }
        if !is_module_name(module) {
            return Err(ConvertError::invalid_input(format!(
                "malformed module name '{}'",
                module
            )));
        }
        let platform: Platform = platform.parse().map_err(|_| {
            ConvertError::invalid_input(format!("unsupported platform '{}'", platform))
        })?;

        let schema = self
            .registry
            .get(module)
            .ok_or_else(|| ConvertError::UnsupportedModule {
                module: module.to_string(),
            })?;

        if let Some(pm) = schema.package_manager {
            if pm != platform.package_manager() {
                return Err(ConvertError::PlatformConflict {
                    platform: platform.to_string(),
                    module: module.to_string(),
                });
            }
        }

        Ok((schema, platform))
    }

    fn run(
        &self,
        ctx: &mut ConversionContext,
        step: &str,
        schema: &ModuleSchema,
        params: &ParameterSet,
    ) -> Result<Vec<DocumentMap>, ConvertError> {
        let documents = self.compile(ctx, step, schema, params)?;
        let expanded = expand(documents)?;
        ctx.enter(ConversionStage::Expanded)?;
        Ok(expanded)
    }

    /// Map, build, resolve and tag one module into a single document map.
    ///
    /// Called recursively for prerequisites; nested calls leave the
    /// context's stage untouched.
    pub(crate) fn compile(
        &self,
        ctx: &mut ConversionContext,
        step: &str,
        schema: &ModuleSchema,
        params: &ParameterSet,
    ) -> Result<DocumentMap, ConvertError> {
        ctx.enter(ConversionStage::Mapping)?;
        let addin = map_attributes(schema, params)?;

        ctx.enter(ConversionStage::Building)?;
        let buckets = self.builder.build_states(schema, addin)?;

        ctx.enter(ConversionStage::ResolvingDeps)?;
        let requires = resolve_requires(self, ctx, schema)?;
        let triggers = resolve_require_in(&self.registry, ctx, step, schema, params);
        let require = edges_to(&requires);
        let require_in = edges_to(&triggers);

        ctx.enter(ConversionStage::Tagging)?;
        let mut documents = requires;
        documents.extend(triggers);

        for (state, attributes) in buckets {
            let tag = make_tag(&schema.id, None, Some(step), None, Some(&state));
            let mut document = Document::new(schema.resource_type, state, attributes)
                .with_require(require.clone())
                .with_require_in(require_in.clone());
            if !schema.require_in.is_empty() {
                document = document.with_scope(Scope::shared());
            }

            debug!(step, module = %schema.id, tag = %tag, depth = ctx.depth(), "tagged document");
            documents.insert(tag, document);
        }

        Ok(documents)
    }
}
