//! Expander
//!
//! Splits version-pinned entries of language package documents into
//! documents of their own. A batched install cannot pin versions per entry,
//! so each `name==version` entry becomes an isolated document that carries
//! the batched document's non-list attributes, its `require`/`require_in`
//! edges and copies of the documents those edges point to.
//!
//! The output is the isolated maps followed by the reduced original map. A
//! reduced document keeps its tag even when all of its entries were pinned.

use tracing::debug;

use crate::document::{Document, DocumentMap};
use crate::error::ConvertError;
use crate::value::{Addin, Value};

const NAMES_KEY: &str = "names";
const PIN_SEPARATOR: &str = "==";

fn is_pinned(entry: &Value) -> bool {
    entry.as_str().is_some_and(|s| s.contains(PIN_SEPARATOR))
}

/// Build the isolated map of one pinned entry
fn isolate(
    documents: &DocumentMap,
    tag: &str,
    parent: &Document,
    entry: &str,
) -> Result<DocumentMap, ConvertError> {
    let (name, version) = entry
        .split_once(PIN_SEPARATOR)
        .map(|(n, v)| (n.trim(), v.trim()))
        .filter(|(n, v)| !n.is_empty() && !v.is_empty())
        .ok_or_else(|| ConvertError::expand_failure(format!("invalid version pin '{}'", entry)))?;

    let mut attributes: Addin = parent
        .attributes
        .iter()
        .filter(|(_, value)| !value.is_list())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if parent.resource_type.splits_version() {
        attributes.insert("name".to_string(), Value::from(name));
        attributes.insert("version".to_string(), Value::from(version));
    } else {
        attributes.insert("name".to_string(), Value::from(entry));
    }

    let mut child = Document::new(parent.resource_type, parent.state.clone(), attributes)
        .with_require(parent.require.clone())
        .with_require_in(parent.require_in.clone());
    child.scope = parent.scope.clone();

    let mut isolated = DocumentMap::new();
    for edge in parent.edges() {
        if let Some(target) = documents.get(&edge.tag) {
            isolated.insert(edge.tag.clone(), target.clone());
        }
    }
    isolated.insert(format!("{}_{}", tag, entry), child);

    Ok(isolated)
}

/// Split pinned entries out of every version-aware document.
///
/// # Errors
///
/// `ExpandFailure` if `documents` is empty or a pinned entry has no name or
/// version.
pub fn expand(documents: DocumentMap) -> Result<Vec<DocumentMap>, ConvertError> {
    if documents.is_empty() {
        return Err(ConvertError::expand_failure("no documents to expand"));
    }

    let mut documents = documents;
    let mut expanded = Vec::new();

    let candidates: Vec<String> = documents
        .iter()
        .filter(|(_, doc)| doc.resource_type.is_version_aware())
        .map(|(tag, _)| tag.clone())
        .collect();

    for tag in candidates {
        let Some(parent) = documents.get(&tag) else {
            continue;
        };
        let Some(names) = parent.attributes.get(NAMES_KEY).and_then(Value::as_list) else {
            continue;
        };
        let (pinned, kept): (Vec<&Value>, Vec<&Value>) = names.iter().partition(|e| is_pinned(e));
        if pinned.is_empty() {
            continue;
        }

        let mut isolated = Vec::with_capacity(pinned.len());
        for entry in pinned.iter().filter_map(|e| e.as_str()) {
            isolated.push(isolate(&documents, &tag, parent, entry)?);
        }
        let kept: Vec<Value> = kept.into_iter().cloned().collect();

        debug!(tag = %tag, pinned = isolated.len(), remaining = kept.len(), "expanded pinned packages");
        expanded.extend(isolated);

        // the parent stays, possibly with no names, so edges into it still resolve
        if let Some(parent) = documents.get_mut(&tag) {
            parent
                .attributes
                .insert(NAMES_KEY.to_string(), Value::List(kept));
        }
    }

    expanded.push(documents);
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Edge, Scope};
    use crate::types::ResourceType;

    fn package_doc(resource_type: ResourceType, names: &[&str]) -> Document {
        let mut attributes = Addin::new();
        attributes.insert("names".into(), Value::strings(names.iter().copied()));
        attributes.insert("user".into(), Value::from("deploy"));
        Document::new(resource_type, "installed", attributes)
    }

    #[test]
    fn test_empty_input_fails() {
        assert!(matches!(
            expand(DocumentMap::new()),
            Err(ConvertError::ExpandFailure { .. })
        ));
    }

    #[test]
    fn test_unpinned_documents_pass_through() {
        let mut documents = DocumentMap::new();
        documents.insert("_1_common_pip_package_installed".into(), package_doc(ResourceType::Pip, &["six"]));

        let expanded = expand(documents.clone()).unwrap();
        assert_eq!(expanded, vec![documents]);
    }

    #[test]
    fn test_gem_pins_split_name_and_version() {
        let prerequisite = Document::new(ResourceType::Pkg, "installed", Addin::new());
        let gem = package_doc(ResourceType::Gem, &["rails==4.0.0", "rake"])
            .with_require(vec![Edge::new(ResourceType::Pkg, "_require_linux_apt_package_installed")]);

        let mut documents = DocumentMap::new();
        documents.insert("_require_linux_apt_package_installed".into(), prerequisite.clone());
        documents.insert("_1_common_gem_package_installed".into(), gem);

        let expanded = expand(documents).unwrap();
        assert_eq!(expanded.len(), 2);

        let isolated = &expanded[0];
        let child = &isolated["_1_common_gem_package_installed_rails==4.0.0"];
        assert_eq!(child.attributes["name"], Value::from("rails"));
        assert_eq!(child.attributes["version"], Value::from("4.0.0"));
        assert_eq!(child.attributes["user"], Value::from("deploy"));
        assert!(!child.attributes.contains_key("names"));
        assert_eq!(child.require[0].tag, "_require_linux_apt_package_installed");
        assert_eq!(isolated["_require_linux_apt_package_installed"], prerequisite);

        let main = &expanded[1];
        assert_eq!(
            main["_1_common_gem_package_installed"].attributes["names"],
            Value::strings(["rake"])
        );
    }

    #[test]
    fn test_fully_pinned_parent_is_kept_empty() {
        let mut documents = DocumentMap::new();
        documents.insert(
            "_2_common_pip_package_installed".into(),
            package_doc(ResourceType::Pip, &["requests==2.1.0"]),
        );

        let expanded = expand(documents).unwrap();
        assert_eq!(expanded.len(), 2);
        let child = &expanded[0]["_2_common_pip_package_installed_requests==2.1.0"];
        assert_eq!(child.attributes["name"], Value::from("requests==2.1.0"));

        let parent = &expanded[1]["_2_common_pip_package_installed"];
        assert_eq!(parent.attributes["names"], Value::List(Vec::new()));
        assert_eq!(parent.attributes["user"], Value::from("deploy"));
    }

    #[test]
    fn test_edges_into_pinned_parent_still_resolve() {
        let pip = package_doc(ResourceType::Pip, &["gunicorn==19.0"]);
        let app = Document::new(ResourceType::Cmd, "run", Addin::new())
            .with_require(vec![Edge::new(ResourceType::Pip, "_require_common_pip_package_installed")]);

        let mut documents = DocumentMap::new();
        documents.insert("_require_common_pip_package_installed".into(), pip);
        documents.insert("_1_site_app_run".into(), app);

        let expanded = expand(documents).unwrap();
        let main = expanded.last().unwrap();
        for doc in main.values() {
            for edge in doc.edges() {
                assert!(main.contains_key(&edge.tag), "dangling edge to {}", edge.tag);
            }
        }
    }

    #[test]
    fn test_isolated_documents_inherit_triggers_and_scope() {
        let trigger = Document::new(ResourceType::Cmd, "run", Addin::new()).with_scope(Scope::shared());
        let prerequisite = Document::new(ResourceType::Pkg, "installed", Addin::new());
        let gem = package_doc(ResourceType::Gem, &["rails==4.0.0"])
            .with_require(vec![Edge::new(ResourceType::Pkg, "_require_linux_apt_package_installed")])
            .with_require_in(vec![Edge::new(ResourceType::Cmd, "_5_linux_cmd_require_in_run")])
            .with_scope(Scope::shared());

        let mut documents = DocumentMap::new();
        documents.insert("_require_linux_apt_package_installed".into(), prerequisite.clone());
        documents.insert("_5_linux_cmd_require_in_run".into(), trigger.clone());
        documents.insert("_5_common_gem_package_installed".into(), gem);

        let expanded = expand(documents).unwrap();
        let isolated = &expanded[0];
        assert_eq!(isolated.len(), 3);

        let child = &isolated["_5_common_gem_package_installed_rails==4.0.0"];
        assert_eq!(child.require_in, vec![Edge::new(ResourceType::Cmd, "_5_linux_cmd_require_in_run")]);
        assert_eq!(child.require[0].tag, "_require_linux_apt_package_installed");
        assert_eq!(child.scope, Some(Scope::shared()));
        assert_eq!(isolated["_5_linux_cmd_require_in_run"], trigger);
        assert_eq!(isolated["_require_linux_apt_package_installed"], prerequisite);
    }

    #[test]
    fn test_invalid_pin_fails() {
        let mut documents = DocumentMap::new();
        documents.insert("_1_common_gem_package_installed".into(), package_doc(ResourceType::Gem, &["==1.0"]));
        assert!(matches!(expand(documents), Err(ConvertError::ExpandFailure { .. })));
    }

    #[test]
    fn test_npm_is_not_expanded() {
        let mut documents = DocumentMap::new();
        documents.insert("_1_common_npm_package_installed".into(), package_doc(ResourceType::Npm, &["a==1"]));
        let expanded = expand(documents.clone()).unwrap();
        assert_eq!(expanded, vec![documents]);
    }
}
