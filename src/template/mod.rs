//! CloudFormation template document model.
//!
//! A [`Template`] is the artefact handed to the deployment engine. Every map
//! is a `BTreeMap` so the rendered JSON is stable across runs.

mod intrinsic;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

pub use intrinsic::Token;

/// Template format version understood by the deployment engine.
pub const FORMAT_VERSION: &str = "2010-09-09";

/// A synthesized template.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Always [`FORMAT_VERSION`].
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Free-form description shown by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Deploy-time parameters keyed by logical ID.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    /// Resources keyed by logical ID.
    pub resources: BTreeMap<String, Resource>,
    /// Outputs keyed by name.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Renders the template as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when a property cannot be rendered.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// What the engine does with the physical resource on replacement or stack
/// deletion.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum RemovalPolicy {
    /// Delete the physical resource.
    Delete,
    /// Leave the physical resource in the account.
    Retain,
    /// Snapshot, then delete.
    Snapshot,
}

/// A single resource declaration.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    /// Provider type such as `AWS::SQS::Queue`.
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Resource properties.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub properties: Value,
    /// Logical IDs that must be created first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Policy applied when an update replaces the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
    /// Policy applied when the stack is deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,
}

impl Resource {
    /// Builds a resource from any serializable property struct. Properties
    /// that render to an empty object are omitted.
    ///
    /// # Errors
    ///
    /// Returns the serializer error when `properties` cannot be converted.
    pub fn new(
        type_name: impl Into<String>,
        properties: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        let rendered = match serde_json::to_value(properties)? {
            Value::Object(map) if map.is_empty() => Value::Null,
            other => other,
        };
        Ok(Self {
            type_name: type_name.into(),
            properties: rendered,
            depends_on: Vec::new(),
            update_replace_policy: None,
            deletion_policy: None,
        })
    }

    /// Adds an explicit ordering dependency.
    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let id = logical_id.into();
        if !self.depends_on.contains(&id) {
            self.depends_on.push(id);
            self.depends_on.sort();
        }
        self
    }

    /// Applies the same policy to replacement and deletion.
    #[must_use]
    pub const fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.update_replace_policy = Some(policy);
        self.deletion_policy = Some(policy);
        self
    }

    /// Looks up a top-level property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// A deploy-time parameter.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    /// Parameter type, for example an SSM-backed image ID.
    #[serde(rename = "Type")]
    pub type_name: String,
    /// Value used when the operator supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Operator-facing description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named value surfaced after apply.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    /// Value expression.
    pub value: Token,
    /// Operator-facing description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A `Key`/`Value` tag pair.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    /// Tag key.
    pub key: String,
    /// Tag value.
    pub value: String,
}

impl Tag {
    /// Builds a tag.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// The `Name` tag the console displays.
    #[must_use]
    pub fn name(value: impl Into<String>) -> Self {
        Self::new("Name", value)
    }
}
