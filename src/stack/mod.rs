//! The stack: the registry every declaration writes into.
//!
//! Declarations register resources under a [`ConstructPath`]; the stack
//! derives a deterministic [`LogicalId`] for each, keeps declaration order
//! for listing, and synthesizes the final [`Template`].

mod logical_id;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::template::{FORMAT_VERSION, Output, Parameter, Resource, Template, Token};

pub use logical_id::{ConstructPath, LogicalId};

const MAX_STACK_NAME_LEN: usize = 128;
const MAX_OUTPUT_NAME_LEN: usize = 255;

/// Errors raised while registering declarations.
#[derive(Debug, Error)]
pub enum StackError {
    /// Raised when the stack name is not usable by the deployment engine.
    #[error(
        "invalid stack name `{0}`: use 1-128 letters, digits or hyphens, starting with a letter"
    )]
    InvalidStackName(String),
    /// Raised when a construct ID has no letters or digits or contains `/`.
    #[error("invalid construct id `{0}`: ids need a letter or digit and must not contain `/`")]
    InvalidConstructId(String),
    /// Raised when two declarations share a construct path.
    #[error("a construct is already declared at `{0}`")]
    DuplicatePath(String),
    /// Raised when two paths map to the same logical ID.
    #[error("logical id `{logical_id}` for `{path}` is already used by another declaration")]
    DuplicateLogicalId {
        /// Colliding logical ID.
        logical_id: String,
        /// Path of the second declaration.
        path: String,
    },
    /// Raised when a parameter is re-declared with different settings.
    #[error("parameter `{0}` is already declared with different settings")]
    ConflictingParameter(String),
    /// Raised when an output name is reused.
    #[error("output `{0}` is already declared")]
    DuplicateOutput(String),
    /// Raised when an output name is empty, too long, or not alphanumeric.
    #[error("invalid output name `{0}`: use 1-255 letters or digits")]
    InvalidOutputName(String),
    /// Raised when resource properties cannot be rendered.
    #[error("failed to render properties of `{path}`: {message}")]
    Properties {
        /// Path of the declaration.
        path: String,
        /// Serializer message.
        message: String,
    },
}

/// A registered resource together with where it was declared.
#[derive(Clone, Debug, PartialEq)]
pub struct DeclaredResource {
    /// Template key.
    pub logical_id: LogicalId,
    /// Declaration path below the stack.
    pub path: ConstructPath,
    /// The resource itself.
    pub resource: Resource,
}

/// A named, deployable unit of declarations.
#[derive(Clone, Debug, PartialEq)]
pub struct Stack {
    name: String,
    description: Option<String>,
    resources: Vec<DeclaredResource>,
    parameters: BTreeMap<String, Parameter>,
    outputs: BTreeMap<String, Output>,
}

impl Stack {
    /// Creates an empty stack.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidStackName`] when `name` does not start with
    /// a letter, contains characters other than letters, digits and hyphens,
    /// or exceeds 128 characters.
    pub fn new(name: &str) -> Result<Self, StackError> {
        let valid = name.len() <= MAX_STACK_NAME_LEN
            && name.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic())
            && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !valid {
            return Err(StackError::InvalidStackName(name.to_owned()));
        }
        Ok(Self {
            name: name.to_owned(),
            description: None,
            resources: Vec::new(),
            parameters: BTreeMap::new(),
            outputs: BTreeMap::new(),
        })
    }

    /// Sets the template description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full node path of a declaration, prefixed with the stack name.
    /// Used for `Name` tags and descriptions.
    #[must_use]
    pub fn node_path(&self, path: &ConstructPath) -> String {
        format!("{}/{path}", self.name)
    }

    /// Registers a resource and returns its logical ID.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::DuplicatePath`] when the path is taken and
    /// [`StackError::DuplicateLogicalId`] when another path already maps to
    /// the same logical ID.
    pub fn add_resource(
        &mut self,
        path: &ConstructPath,
        resource: Resource,
    ) -> Result<LogicalId, StackError> {
        if self.resources.iter().any(|declared| &declared.path == path) {
            return Err(StackError::DuplicatePath(path.to_string()));
        }
        let logical_id = path.logical_id();
        if self.is_taken(logical_id.as_str()) {
            return Err(StackError::DuplicateLogicalId {
                logical_id: logical_id.to_string(),
                path: path.to_string(),
            });
        }

        debug!(
            stack = %self.name,
            path = %path,
            logical_id = %logical_id,
            resource_type = %resource.type_name,
            "declared resource"
        );
        self.resources.push(DeclaredResource {
            logical_id: logical_id.clone(),
            path: path.clone(),
            resource,
        });
        Ok(logical_id)
    }

    /// Registers a resource built from a property struct.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::Properties`] when the properties cannot be
    /// rendered, or any error from [`Stack::add_resource`].
    pub fn add<P: serde::Serialize>(
        &mut self,
        path: &ConstructPath,
        type_name: &str,
        properties: &P,
        customise: impl FnOnce(Resource) -> Resource,
    ) -> Result<LogicalId, StackError> {
        let resource =
            Resource::new(type_name, properties).map_err(|err| StackError::Properties {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        self.add_resource(path, customise(resource))
    }

    /// Registers a template parameter and returns a `Ref` to it. Declaring
    /// the same parameter twice with identical settings returns the existing
    /// reference.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::ConflictingParameter`] when the ID is already
    /// declared with different settings, or [`StackError::DuplicateLogicalId`]
    /// when a resource already uses the ID.
    pub fn add_parameter(
        &mut self,
        logical_id: &LogicalId,
        parameter: Parameter,
    ) -> Result<Token, StackError> {
        if let Some(existing) = self.parameters.get(logical_id.as_str()) {
            if *existing == parameter {
                return Ok(logical_id.reference());
            }
            return Err(StackError::ConflictingParameter(logical_id.to_string()));
        }
        if self.is_taken(logical_id.as_str()) {
            return Err(StackError::DuplicateLogicalId {
                logical_id: logical_id.to_string(),
                path: String::from("(parameter)"),
            });
        }
        self.parameters.insert(logical_id.to_string(), parameter);
        Ok(logical_id.reference())
    }

    /// Declares a named output.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidOutputName`] for names that are empty,
    /// too long or not alphanumeric, and [`StackError::DuplicateOutput`] when
    /// the name is already declared.
    pub fn add_output(
        &mut self,
        name: &str,
        value: Token,
        description: Option<&str>,
    ) -> Result<(), StackError> {
        if name.is_empty()
            || name.len() > MAX_OUTPUT_NAME_LEN
            || !name.chars().all(|ch| ch.is_ascii_alphanumeric())
        {
            return Err(StackError::InvalidOutputName(name.to_owned()));
        }
        if self.outputs.contains_key(name) {
            return Err(StackError::DuplicateOutput(name.to_owned()));
        }
        self.outputs.insert(
            name.to_owned(),
            Output {
                value,
                description: description.map(str::to_owned),
            },
        );
        Ok(())
    }

    /// Resources in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[DeclaredResource] {
        &self.resources
    }

    /// Looks up a resource by logical ID.
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|declared| declared.logical_id.as_str() == logical_id)
            .map(|declared| &declared.resource)
    }

    /// Declared outputs keyed by name.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Removes every output. Outputs are a projection over resources, so the
    /// resource set is untouched.
    pub fn clear_outputs(&mut self) {
        self.outputs.clear();
    }

    /// Produces the template document for the deployment engine.
    #[must_use]
    pub fn synth(&self) -> Template {
        Template {
            format_version: String::from(FORMAT_VERSION),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            resources: self
                .resources
                .iter()
                .map(|declared| (declared.logical_id.to_string(), declared.resource.clone()))
                .collect(),
            outputs: self.outputs.clone(),
        }
    }

    fn is_taken(&self, logical_id: &str) -> bool {
        self.parameters.contains_key(logical_id)
            || self
                .resources
                .iter()
                .any(|declared| declared.logical_id.as_str() == logical_id)
    }
}
