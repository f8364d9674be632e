//! Managed secret declaration.
//!
//! The secret value is never produced here: the declaration carries a
//! generation policy (a JSON template, the key whose value is generated, and
//! characters the generated value must avoid) and the provider fills the
//! value in at creation time.

use std::collections::BTreeSet;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use crate::stack::{ConstructPath, LogicalId, Stack, StackError};
use crate::template::{RemovalPolicy, Token};

const MAX_NAME_LEN: usize = 512;
const MAX_PASSWORD_LENGTH: u16 = 4096;
const NAME_PUNCTUATION: &str = "/_+=.@-";

/// Errors raised while declaring a secret.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Raised when the secret name is empty, too long, or uses unsupported
    /// characters.
    #[error("invalid secret name `{0}`: use 1-512 letters, digits or /_+=.@-")]
    InvalidName(String),
    /// Raised when the template has no fields.
    #[error("secret template must contain at least one field")]
    EmptyTemplate,
    /// Raised when a template field is declared twice.
    #[error("secret template field `{0}` is declared more than once")]
    DuplicateField(String),
    /// Raised when the generated key is empty.
    #[error("the key to generate must not be empty")]
    EmptyGenerateKey,
    /// Raised when the generated key is not a template field.
    #[error("generated key `{0}` is not a field of the secret template")]
    UnknownGenerateKey(String),
    /// Raised when the requested length is out of range.
    #[error("generated length {0} must be between 1 and {max}", max = MAX_PASSWORD_LENGTH)]
    InvalidLength(u16),
    /// Raised when the excluded set leaves nothing to generate from.
    #[error("excluded characters leave no printable characters to generate from")]
    NothingToGenerate,
    /// Raised when the template cannot be rendered.
    #[error("failed to render secret template: {0}")]
    Template(String),
    /// Raised when registration with the stack fails.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Ordered JSON object of placeholder fields the provider starts from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SecretTemplate {
    fields: Vec<(String, String)>,
}

impl SecretTemplate {
    /// An empty template.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field with a placeholder value.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.fields.push((key.into(), placeholder.into()));
        self
    }

    /// Field keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// Returns true when `key` is a field.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys().any(|candidate| candidate == key)
    }

    /// Renders the template as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if rendering fails.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for SecretTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, placeholder) in &self.fields {
            map.serialize_entry(key, placeholder)?;
        }
        map.end()
    }
}

/// How the provider generates the secret value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretGenerator {
    /// Starting JSON structure.
    pub template: SecretTemplate,
    /// Field whose value is generated.
    pub generate_key: String,
    /// Characters the generated value must not contain.
    pub exclude_characters: String,
    /// Generated length; the provider default applies when unset.
    pub password_length: Option<u16>,
}

impl SecretGenerator {
    /// Returns true when `ch` may appear in the generated value.
    #[must_use]
    pub fn permits(&self, ch: char) -> bool {
        !self.exclude_characters.contains(ch)
    }

    fn validate(&self) -> Result<(), SecretError> {
        if self.template.fields.is_empty() {
            return Err(SecretError::EmptyTemplate);
        }
        let mut seen = BTreeSet::new();
        for key in self.template.keys() {
            if !seen.insert(key) {
                return Err(SecretError::DuplicateField(key.to_owned()));
            }
        }
        if self.generate_key.trim().is_empty() {
            return Err(SecretError::EmptyGenerateKey);
        }
        if !self.template.contains(&self.generate_key) {
            return Err(SecretError::UnknownGenerateKey(self.generate_key.clone()));
        }
        if let Some(length) = self.password_length
            && !(1..=MAX_PASSWORD_LENGTH).contains(&length)
        {
            return Err(SecretError::InvalidLength(length));
        }
        if !('!'..='~').any(|ch| self.permits(ch)) {
            return Err(SecretError::NothingToGenerate);
        }
        Ok(())
    }
}

/// Inputs for [`Secret::declare`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretProps {
    /// Physical secret name.
    pub name: String,
    /// Operator-facing description.
    pub description: Option<String>,
    /// Generation policy.
    pub generator: SecretGenerator,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecretProperties<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    generate_secret_string: GenerateSecretString<'a>,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GenerateSecretString<'a> {
    exclude_characters: &'a str,
    generate_string_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_length: Option<u16>,
    secret_string_template: String,
}

/// Handle to a declared secret.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Secret {
    logical_id: LogicalId,
    name: String,
    generator: SecretGenerator,
}

impl Secret {
    /// Declares a secret whose value is generated by the provider. The secret
    /// is deleted with the stack.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the name or generation policy is invalid,
    /// or when registration fails.
    pub fn declare(stack: &mut Stack, id: &str, props: &SecretProps) -> Result<Self, SecretError> {
        let name = props.name.trim();
        let valid_name = !name.is_empty()
            && name.chars().count() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || NAME_PUNCTUATION.contains(ch));
        if !valid_name {
            return Err(SecretError::InvalidName(props.name.clone()));
        }
        props.generator.validate()?;

        let rendered = props
            .generator
            .template
            .render()
            .map_err(|err| SecretError::Template(err.to_string()))?;

        let logical_id = stack.add(
            &ConstructPath::root(id)?.child("Resource")?,
            "AWS::SecretsManager::Secret",
            &SecretProperties {
                description: props.description.as_deref(),
                generate_secret_string: GenerateSecretString {
                    exclude_characters: &props.generator.exclude_characters,
                    generate_string_key: &props.generator.generate_key,
                    password_length: props.generator.password_length,
                    secret_string_template: rendered,
                },
                name,
            },
            |resource| resource.removal_policy(RemovalPolicy::Delete),
        )?;
        info!(
            secret = id,
            name,
            generated_key = %props.generator.generate_key,
            "declared secret"
        );

        Ok(Self {
            logical_id,
            name: name.to_owned(),
            generator: props.generator.clone(),
        })
    }

    /// Template key of the secret resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Resolves to the secret ARN (the secret's `Ref`).
    #[must_use]
    pub fn secret_arn(&self) -> Token {
        self.logical_id.reference()
    }

    /// Physical secret name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generation policy the secret was declared with.
    #[must_use]
    pub const fn generator(&self) -> &SecretGenerator {
        &self.generator
    }
}
