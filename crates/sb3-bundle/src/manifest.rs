//! Project manifest model and validation.
//!
//! A manifest is the `project.json` document of a project archive. Only a
//! handful of markers are interpreted:
//! - `targets`: ordered entities, each with a `name` and an `isStage` flag
//! - `variables`, `lists`, `broadcasts`: flat global namespaces
//!
//! Everything else (target content, `meta`, `extensions`, monitors) is kept
//! as opaque JSON and written back untouched.

use crate::{BundleError, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Canonical manifest entry name within an archive.
pub const MANIFEST_FILE_NAME: &str = "project.json";

/// Identifier → opaque value mapping.
pub type Namespace = Map<String, Value>;

/// One of the global namespace mappings shared by all targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind {
    Variables,
    Lists,
    Broadcasts,
}

impl NamespaceKind {
    pub const ALL: [NamespaceKind; 3] = [
        NamespaceKind::Variables,
        NamespaceKind::Lists,
        NamespaceKind::Broadcasts,
    ];

    /// Top-level manifest key for this namespace.
    pub fn key(self) -> &'static str {
        match self {
            NamespaceKind::Variables => "variables",
            NamespaceKind::Lists => "lists",
            NamespaceKind::Broadcasts => "broadcasts",
        }
    }
}

impl fmt::Display for NamespaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A named entity in the manifest: a sprite or the stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub name: String,

    #[serde(rename = "isStage")]
    pub is_stage: bool,

    /// Blocks, costumes, sounds and the rest, never inspected.
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

impl Target {
    /// Validate one element of the `targets` array.
    fn from_value(index: usize, value: Value) -> Result<Self> {
        let Value::Object(mut content) = value else {
            return Err(BundleError::MalformedManifest(format!(
                "targets[{index}] is not an object"
            )));
        };

        let name = match content.shift_remove("name") {
            Some(Value::String(name)) => name,
            Some(_) => {
                return Err(BundleError::MalformedManifest(format!(
                    "targets[{index}].name is not a string"
                )))
            }
            None => {
                return Err(BundleError::MalformedManifest(format!(
                    "targets[{index}] has no name"
                )))
            }
        };

        let is_stage = match content.shift_remove("isStage") {
            Some(Value::Bool(flag)) => flag,
            Some(_) => {
                return Err(BundleError::MalformedManifest(format!(
                    "targets[{index}].isStage is not a boolean"
                )))
            }
            None => {
                return Err(BundleError::MalformedManifest(format!(
                    "target '{name}' has no isStage flag"
                )))
            }
        };

        Ok(Self {
            name,
            is_stage,
            content,
        })
    }
}

/// A validated project manifest.
///
/// Produced only by [`ProjectManifest::parse`] / [`ProjectManifest::from_value`],
/// so holding one means every required marker was present and well-typed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectManifest {
    pub targets: Vec<Target>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Namespace>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lists: Option<Namespace>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcasts: Option<Namespace>,

    /// Top-level fields that are not merge targets.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProjectManifest {
    /// Parse and validate raw manifest bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| BundleError::MalformedManifest(format!("not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validate an already parsed JSON document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut fields) = value else {
            return Err(BundleError::MalformedManifest(
                "top level is not an object".to_string(),
            ));
        };

        let targets = match fields.shift_remove("targets") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| Target::from_value(index, item))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(BundleError::MalformedManifest(
                    "'targets' is not an array".to_string(),
                ))
            }
            None => {
                return Err(BundleError::MalformedManifest(
                    "missing 'targets'".to_string(),
                ))
            }
        };

        let variables = take_namespace(&mut fields, NamespaceKind::Variables)?;
        let lists = take_namespace(&mut fields, NamespaceKind::Lists)?;
        let broadcasts = take_namespace(&mut fields, NamespaceKind::Broadcasts)?;

        Ok(Self {
            targets,
            variables,
            lists,
            broadcasts,
            extra: fields,
        })
    }

    /// The canonical stage target, if any.
    pub fn stage(&self) -> Option<&Target> {
        self.targets.iter().find(|t| t.is_stage)
    }

    /// Non-stage targets in manifest order.
    pub fn sprites(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| !t.is_stage)
    }

    /// Find a non-stage target by exact name.
    pub fn find_sprite(&self, name: &str) -> Option<&Target> {
        self.sprites().find(|t| t.name == name)
    }

    /// Borrow a global namespace mapping.
    pub fn namespace(&self, kind: NamespaceKind) -> Option<&Namespace> {
        match kind {
            NamespaceKind::Variables => self.variables.as_ref(),
            NamespaceKind::Lists => self.lists.as_ref(),
            NamespaceKind::Broadcasts => self.broadcasts.as_ref(),
        }
    }

    /// Mutable slot for a global namespace mapping.
    pub fn namespace_slot(&mut self, kind: NamespaceKind) -> &mut Option<Namespace> {
        match kind {
            NamespaceKind::Variables => &mut self.variables,
            NamespaceKind::Lists => &mut self.lists,
            NamespaceKind::Broadcasts => &mut self.broadcasts,
        }
    }

    /// Number of entries in a namespace (absent counts as empty).
    pub fn namespace_len(&self, kind: NamespaceKind) -> usize {
        self.namespace(kind).map_or(0, Map::len)
    }

    /// Convert back into a plain JSON document.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Serialize with four-space indentation, non-ASCII text kept verbatim.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)?;
        Ok(out)
    }
}

fn take_namespace(fields: &mut Map<String, Value>, kind: NamespaceKind) -> Result<Option<Namespace>> {
    match fields.shift_remove(kind.key()) {
        None => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(BundleError::MalformedManifest(format!(
            "'{}' is not an object",
            kind.key()
        ))),
    }
}
