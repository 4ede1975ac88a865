//! Dependency Resolver
//!
//! Generates the documents a module's own documents depend on.
//!
//! # Design
//!
//! - **require**: every static prerequisite is converted through the full
//!   pipeline under the fixed step `require`, so a prerequisite is tagged the
//!   same way no matter which module pulled it in.
//! - **require_in**: every trigger is built directly from the declaring
//!   module's raw parameters and placed in the shared document group.
//! - **Platform filter**: prerequisites and triggers bound to a package
//!   manager other than the platform's are skipped, so a host never gets
//!   both apt and yum documents.
//!
//! # Trigger Attribute Sources
//!
//! | Source                              | Produced value                      |
//! |-------------------------------------|-------------------------------------|
//! | `name` (a raw parameter)            | the parameter value, unchanged      |
//! | `yum-config-manager --enable $name` | template with `$name` substituted   |
//! | template with an unknown `$token`   | attribute dropped                   |

use tracing::debug;

use super::tag::make_tag;
use crate::converter::Converter;
use crate::document::{Document, DocumentMap, Scope};
use crate::error::ConvertError;
use crate::registry::{ModuleSchema, Registry};
use crate::stage::ConversionContext;
use crate::value::{Addin, ParameterSet, Value};

/// Step id under which prerequisite modules are converted
pub const REQUIRE_STEP: &str = "require";

/// Tag qualifier of trigger documents
pub const REQUIRE_IN_NAME: &str = "require_in";

const TOKEN_PREFIX: char = '$';

/// Whether a module bound to a package manager may run on the context's platform
fn runs_on_platform(schema: &ModuleSchema, ctx: &ConversionContext) -> bool {
    schema
        .package_manager
        .is_none_or(|pm| pm == ctx.package_manager())
}

// ============================================================================
// require
// ============================================================================

/// Convert every prerequisite of `schema` and merge the resulting documents.
///
/// # Errors
///
/// Any failure of a prerequisite's own conversion, or `Internal` if
/// prerequisites nest deeper than the context allows.
pub fn resolve_requires(
    converter: &Converter,
    ctx: &mut ConversionContext,
    schema: &ModuleSchema,
) -> Result<DocumentMap, ConvertError> {
    let mut documents = DocumentMap::new();

    for prerequisite in &schema.require {
        let Some(required) = converter.registry().get(&prerequisite.module) else {
            debug!(module = %schema.id, prerequisite = %prerequisite.module, "unknown prerequisite skipped");
            continue;
        };
        if !runs_on_platform(required, ctx) {
            debug!(
                module = %schema.id,
                prerequisite = %required.id,
                platform = %ctx.platform(),
                "prerequisite skipped on platform"
            );
            continue;
        }

        ctx.descend()?;
        let result = converter.compile(ctx, REQUIRE_STEP, required, &prerequisite.parameters);
        ctx.ascend();

        documents.extend(result?);
    }

    Ok(documents)
}

// ============================================================================
// require_in
// ============================================================================

/// Replace every `$token` word of a template with the matching parameter.
///
/// Returns `None` if any token has no scalar value in `params`.
pub fn substitute_tokens(template: &str, params: &ParameterSet) -> Option<String> {
    template
        .split_whitespace()
        .map(|word| match word.strip_prefix(TOKEN_PREFIX) {
            Some(key) => params.get(key).and_then(Value::to_text),
            None => Some(word.to_string()),
        })
        .collect::<Option<Vec<_>>>()
        .map(|words| words.join(" "))
}

/// Build the trigger documents of `schema` from the module's raw parameters.
///
/// Triggers whose attributes all come out empty are skipped.
pub fn resolve_require_in(
    registry: &Registry,
    ctx: &ConversionContext,
    step: &str,
    schema: &ModuleSchema,
    params: &ParameterSet,
) -> DocumentMap {
    let mut documents = DocumentMap::new();

    for trigger in &schema.require_in {
        let Some(triggered) = registry.get(&trigger.module) else {
            debug!(module = %schema.id, trigger = %trigger.module, "unknown trigger skipped");
            continue;
        };
        if !runs_on_platform(triggered, ctx) {
            continue;
        }

        let mut addin = Addin::new();
        for attribute in &trigger.attributes {
            if attribute.target.is_empty() {
                continue;
            }
            if let Some(value) = params.get(&attribute.source) {
                if !value.is_null() {
                    addin.insert(attribute.target.clone(), value.clone());
                }
            } else if attribute.source.contains(TOKEN_PREFIX) {
                match substitute_tokens(&attribute.source, params) {
                    Some(text) => {
                        addin.insert(attribute.target.clone(), Value::Str(text));
                    }
                    None => debug!(
                        module = %schema.id,
                        template = %attribute.source,
                        "trigger attribute dropped, missing parameter"
                    ),
                }
            }
        }

        if addin.is_empty() {
            debug!(module = %schema.id, trigger = %trigger.module, "empty trigger skipped");
            continue;
        }

        let state = triggered.default_state();
        let tag = make_tag(&trigger.module, None, Some(step), Some(REQUIRE_IN_NAME), Some(state));
        let document =
            Document::new(triggered.resource_type, state, addin).with_scope(Scope::shared());
        documents.insert(tag, document);
    }

    documents
}
