//! Attribute Mapper
//!
//! Renames raw step parameters to backend attribute keys using a module's
//! rename table. `{name: value}` mappings are reshaped into lists so package
//! style modules can carry per-entry state overrides:
//!
//! | Raw value                          | Mapped value                     |
//! |------------------------------------|----------------------------------|
//! | `{"nginx": "", "htop": "removed"}` | `[{"htop": "removed"}, "nginx"]` |
//! | `"/srv/app"`                       | `"/srv/app"`                     |
//! | `["a", "b"]`                       | `["a", "b"]`                     |

use tracing::debug;

use crate::error::ConvertError;
use crate::registry::ModuleSchema;
use crate::value::{Addin, ParameterSet, Value};

/// Map raw parameters to a backend attribute set.
///
/// Null values and attributes unknown to the schema are dropped.
///
/// # Errors
///
/// `EmptyMapping` if no parameter is known to the schema.
pub fn map_attributes(schema: &ModuleSchema, params: &ParameterSet) -> Result<Addin, ConvertError> {
    let mut addin = Addin::new();

    for (attr, value) in params {
        if value.is_null() {
            continue;
        }
        let Some(key) = schema.backend_key(attr) else {
            debug!(module = %schema.id, attribute = %attr, "ignoring unknown attribute");
            continue;
        };

        let mapped = match value {
            Value::Map(entries) => Value::List(
                entries
                    .iter()
                    .map(|(name, v)| {
                        if v.is_truthy() {
                            Value::pair(name.clone(), v.clone())
                        } else {
                            Value::Str(name.clone())
                        }
                    })
                    .collect(),
            ),
            other => other.clone(),
        };
        addin.insert(key.to_string(), mapped);
    }

    if addin.is_empty() {
        return Err(ConvertError::EmptyMapping {
            module: schema.id.clone(),
        });
    }
    Ok(addin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceType;

    fn schema() -> ModuleSchema {
        ModuleSchema::builder("linux.apt.package", ResourceType::Pkg)
            .attribute("name", "pkgs")
            .attribute("repo", "fromrepo")
            .states(&["installed", "removed"])
            .build()
            .unwrap()
    }

    fn params(entries: &[(&str, Value)]) -> ParameterSet {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_renames_scalars() {
        let addin = map_attributes(&schema(), &params(&[("repo", Value::from("main"))])).unwrap();
        assert_eq!(addin.get("fromrepo"), Some(&Value::from("main")));
        assert!(!addin.contains_key("repo"));
    }

    #[test]
    fn test_reshapes_mappings() {
        let mut pkgs = std::collections::BTreeMap::new();
        pkgs.insert("nginx".to_string(), Value::from(""));
        pkgs.insert("htop".to_string(), Value::from("removed"));
        let addin = map_attributes(&schema(), &params(&[("name", Value::Map(pkgs))])).unwrap();

        assert_eq!(
            addin.get("pkgs"),
            Some(&Value::List(vec![
                Value::pair("htop", "removed"),
                Value::from("nginx"),
            ]))
        );
    }

    #[test]
    fn test_drops_nulls_and_unknown_attributes() {
        let addin = map_attributes(
            &schema(),
            &params(&[
                ("name", Value::strings(["git"])),
                ("repo", Value::Null),
                ("colour", Value::from("blue")),
            ]),
        )
        .unwrap();
        assert_eq!(addin.len(), 1);
        assert!(addin.contains_key("pkgs"));
    }

    #[test]
    fn test_empty_mapping_fails() {
        let result = map_attributes(&schema(), &params(&[("colour", Value::from("blue"))]));
        assert!(matches!(result, Err(ConvertError::EmptyMapping { .. })));

        let result = map_attributes(&schema(), &params(&[("name", Value::Null)]));
        assert!(matches!(result, Err(ConvertError::EmptyMapping { .. })));
    }
}
