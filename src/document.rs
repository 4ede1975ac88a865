//! Output documents.
//!
//! A document is one unit of the backend's state format, keyed by its tag in
//! a [`DocumentMap`]. It serializes to the backend's logical shape:
//!
//! ```json
//! {
//!   "pkg": [
//!     "installed",
//!     { "pkgs": ["git"] },
//!     { "require": [ { "cmd": "_1_linux_cmd_run" } ] }
//!   ],
//!   "__env__": "base",
//!   "__sls__": "state_adaptor"
//! }
//! ```
//!
//! Edges reference other documents by tag only and resolve against the map
//! they are emitted in.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::types::ResourceType;
use crate::value::Addin;

/// Documents of one conversion keyed by tag
pub type DocumentMap = BTreeMap<String, Document>;

/// Environment of documents in the shared top-level group
pub const SHARED_ENV: &str = "base";

/// Logical group shared by documents that take part in cross-call triggers
pub const SHARED_GROUP: &str = "state_adaptor";

const ENV_KEY: &str = "__env__";
const GROUP_KEY: &str = "__sls__";

/// Reference to another document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub resource_type: ResourceType,
    pub tag: String,
}

impl Edge {
    pub fn new(resource_type: ResourceType, tag: impl Into<String>) -> Self {
        Self {
            resource_type,
            tag: tag.into(),
        }
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.resource_type, &self.tag)?;
        map.end()
    }
}

/// Execution environment and group metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub env: String,
    pub group: String,
}

impl Scope {
    /// The shared top-level group
    pub fn shared() -> Self {
        Self {
            env: SHARED_ENV.to_string(),
            group: SHARED_GROUP.to_string(),
        }
    }
}

/// One emitted state document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub resource_type: ResourceType,
    pub state: String,
    pub attributes: Addin,
    pub require: Vec<Edge>,
    pub require_in: Vec<Edge>,
    pub watch: Vec<Edge>,
    pub scope: Option<Scope>,
}

impl Document {
    pub fn new(resource_type: ResourceType, state: impl Into<String>, attributes: Addin) -> Self {
        Self {
            resource_type,
            state: state.into(),
            attributes,
            require: Vec::new(),
            require_in: Vec::new(),
            watch: Vec::new(),
            scope: None,
        }
    }

    pub fn with_require(mut self, edges: Vec<Edge>) -> Self {
        self.require = edges;
        self
    }

    pub fn with_require_in(mut self, edges: Vec<Edge>) -> Self {
        self.require_in = edges;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// All outgoing ordering edges
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.require
            .iter()
            .chain(self.require_in.iter())
            .chain(self.watch.iter())
    }
}

struct EdgeList<'a>(&'static str, &'a [Edge]);

impl Serialize for EdgeList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.0, self.1)?;
        map.end()
    }
}

struct Chunks<'a>(&'a Document);

impl Serialize for Chunks<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let doc = self.0;
        let mut seq = serializer.serialize_seq(None)?;
        seq.serialize_element(&doc.state)?;
        seq.serialize_element(&doc.attributes)?;
        for (key, edges) in [
            ("require", &doc.require),
            ("require_in", &doc.require_in),
            ("watch", &doc.watch),
        ] {
            if !edges.is_empty() {
                seq.serialize_element(&EdgeList(key, edges))?;
            }
        }
        seq.end()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(&self.resource_type, &Chunks(self))?;
        if let Some(scope) = &self.scope {
            map.serialize_entry(ENV_KEY, &scope.env)?;
            map.serialize_entry(GROUP_KEY, &scope.group)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn attrs() -> Addin {
        let mut addin = Addin::new();
        addin.insert("pkgs".into(), Value::strings(["git"]));
        addin
    }

    #[test]
    fn test_plain_document_shape() {
        let doc = Document::new(ResourceType::Pkg, "installed", attrs());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value, json!({ "pkg": ["installed", { "pkgs": ["git"] }] }));
    }

    #[test]
    fn test_document_with_edges_and_scope() {
        let doc = Document::new(ResourceType::File, "managed", Addin::new())
            .with_require(vec![Edge::new(ResourceType::Pkg, "_require_linux_yum_package_installed")])
            .with_require_in(vec![Edge::new(ResourceType::Cmd, "_1_linux_cmd_require_in_run")])
            .with_scope(Scope::shared());
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            value,
            json!({
                "file": [
                    "managed",
                    {},
                    { "require": [ { "pkg": "_require_linux_yum_package_installed" } ] },
                    { "require_in": [ { "cmd": "_1_linux_cmd_require_in_run" } ] }
                ],
                "__env__": "base",
                "__sls__": "state_adaptor"
            })
        );
    }

    #[test]
    fn test_edges_iterator() {
        let doc = Document::new(ResourceType::Gem, "installed", Addin::new())
            .with_require(vec![Edge::new(ResourceType::Pkg, "a")])
            .with_require_in(vec![Edge::new(ResourceType::Cmd, "b")]);
        let tags: Vec<&str> = doc.edges().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["a", "b"]);
    }
}
