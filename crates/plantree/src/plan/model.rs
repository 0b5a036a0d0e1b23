// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Dragonscale Team

//! Plan node model as produced by the query engine.
//!
//! Field names follow the protobuf JSON mapping (`displayName`, `childLinks`, ...);
//! the snake_case proto field names are accepted as aliases so YAML dumps of
//! either flavour load unchanged. As in protobuf JSON, `null` reads as the
//! field's default and enums may be given by number.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Whether a node produces rows or computes a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum PlanNodeKind {
    #[default]
    #[serde(rename = "KIND_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "RELATIONAL")]
    Relational,
    #[serde(rename = "SCALAR")]
    Scalar,
}

impl PlanNodeKind {
    fn from_number(number: i64) -> Option<Self> {
        match number {
            0 => Some(Self::Unspecified),
            1 => Some(Self::Relational),
            2 => Some(Self::Scalar),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "KIND_UNSPECIFIED" => Some(Self::Unspecified),
            "RELATIONAL" => Some(Self::Relational),
            "SCALAR" => Some(Self::Scalar),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for PlanNodeKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Number(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => Self::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown plan node kind: {}", name))
            }),
            Repr::Number(number) => Self::from_number(number).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown plan node kind number: {}", number))
            }),
        }
    }
}

/// Reads an explicit `null` as the field's default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Directed, labeled edge from a parent node to one of its children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildLink {
    #[serde(default, alias = "child_index", deserialize_with = "null_as_default")]
    pub child_index: u32,

    /// Role of the child, e.g. `Map`, `Residual Condition`, `Scalar`. Often empty.
    #[serde(default, rename = "type", deserialize_with = "null_as_default")]
    pub link_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl ChildLink {
    pub fn new(child_index: u32) -> Self {
        Self {
            child_index,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = link_type.into();
        self
    }

    #[must_use]
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = Some(variable.into());
        self
    }
}

/// Condensed, human readable form of a scalar node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortRepresentation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub subqueries: BTreeMap<String, u32>,
}

/// A single metadata value.
///
/// Metadata arrives untyped; every value is narrowed to this closed set when
/// the plan is loaded. Lists and objects keep their JSON text as a string.
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataValue {
    String(String),
    Bool(bool),
    /// Kept as parsed, so large integers display exactly.
    Number(serde_json::Number),
    Absent,
}

impl MetadataValue {
    /// Returns the value only if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Known boolean flags are usually encoded as the string `"true"`.
    pub fn is_true(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => s == "true",
            Self::Number(_) | Self::Absent => false,
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Absent => Ok(()),
        }
    }
}

impl From<serde_json::Value> for MetadataValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Absent,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => {
                Self::String(other.to_string())
            }
        }
    }
}

impl From<MetadataValue> for serde_json::Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::String(s) => serde_json::Value::String(s),
            MetadataValue::Bool(b) => serde_json::Value::Bool(b),
            MetadataValue::Number(n) => serde_json::Value::Number(n),
            MetadataValue::Absent => serde_json::Value::Null,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl Serialize for MetadataValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MetadataValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

/// Metadata of one node. Key order is irrelevant; a sorted map keeps iteration stable.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// One operator or expression of a query execution plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    #[serde(default, deserialize_with = "null_as_default")]
    pub index: u32,

    #[serde(default, deserialize_with = "null_as_default")]
    pub kind: PlanNodeKind,

    #[serde(default, alias = "display_name", deserialize_with = "null_as_default")]
    pub display_name: String,

    #[serde(default, alias = "child_links", deserialize_with = "null_as_default")]
    pub child_links: Vec<ChildLink>,

    #[serde(
        default,
        alias = "short_representation",
        skip_serializing_if = "Option::is_none"
    )]
    pub short_representation: Option<ShortRepresentation>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,

    /// Untyped runtime statistics; only present on profiled plans.
    #[serde(
        default,
        alias = "execution_stats",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_stats: Option<serde_json::Value>,
}

impl PlanNode {
    pub fn new(index: u32, kind: PlanNodeKind, display_name: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            display_name: display_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_child(mut self, link: ChildLink) -> Self {
        self.child_links.push(link);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.short_representation = Some(ShortRepresentation {
            description: description.into(),
            ..ShortRepresentation::default()
        });
        self
    }

    /// Short description, or an empty string if the node has none.
    pub fn description(&self) -> &str {
        self.short_representation
            .as_ref()
            .map_or("", |r| r.description.as_str())
    }

    /// Metadata value of `key` if it is a string.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetadataValue::as_str)
    }
}
