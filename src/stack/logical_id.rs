//! Construct paths and the logical IDs derived from them.

use std::fmt;
use std::ops::Deref;

use sha2::{Digest, Sha256};

use super::StackError;
use crate::template::Token;

/// Path component hidden from both the human part and the hash.
const HIDDEN_ID: &str = "Default";
/// Path component hidden from the human part only.
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Location of a declaration below the stack, such as
/// `MyVpc/PublicSubnet1/Subnet`.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    /// Starts a path at a top-level construct.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConstructId`] when `id` contains `/` or
    /// has no ASCII letters or digits.
    pub fn root(id: &str) -> Result<Self, StackError> {
        validate_component(id)?;
        Ok(Self(vec![id.to_owned()]))
    }

    /// Extends the path by one component.
    ///
    /// # Errors
    ///
    /// Returns [`StackError::InvalidConstructId`] when `id` contains `/` or
    /// has no ASCII letters or digits.
    pub fn child(&self, id: &str) -> Result<Self, StackError> {
        validate_component(id)?;
        let mut components = self.0.clone();
        components.push(id.to_owned());
        Ok(Self(components))
    }

    /// Path components, outermost first.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Derives the logical ID for this path.
    ///
    /// A single-component path maps to its alphanumeric characters. Deeper
    /// paths join their alphanumeric components (dropping `Resource`,
    /// `Default` and consecutive duplicates) and append an 8 digit hash of
    /// the full path so distinct paths never collide.
    #[must_use]
    pub fn logical_id(&self) -> LogicalId {
        if let [only] = self.0.as_slice() {
            let candidate = alphanumeric(only);
            if candidate.len() <= MAX_ID_LEN {
                return LogicalId(candidate);
            }
        }

        let hashed: Vec<&str> = self
            .0
            .iter()
            .map(String::as_str)
            .filter(|component| *component != HIDDEN_ID)
            .collect();
        let digest = Sha256::digest(hashed.join("/").as_bytes());
        let hash: String = hex::encode_upper(digest).chars().take(HASH_LEN).collect();

        let mut human = String::new();
        let mut previous: Option<&str> = None;
        for component in hashed.iter().copied() {
            if component == HIDDEN_FROM_HUMAN_ID || previous == Some(component) {
                continue;
            }
            previous = Some(component);
            human.push_str(&alphanumeric(component));
        }
        let truncated: String = human.chars().take(MAX_HUMAN_LEN).collect();

        LogicalId(format!("{truncated}{hash}"))
    }
}

impl fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

fn validate_component(id: &str) -> Result<(), StackError> {
    if id.contains('/') || !id.chars().any(|ch| ch.is_ascii_alphanumeric()) {
        return Err(StackError::InvalidConstructId(id.to_owned()));
    }
    Ok(())
}

fn alphanumeric(value: &str) -> String {
    value.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Key of a resource or parameter in the synthesized template.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LogicalId(String);

impl LogicalId {
    /// Borrows the identifier.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// `Ref` to this resource.
    #[must_use]
    pub fn reference(&self) -> Token {
        Token::Ref(self.0.clone())
    }

    /// `Fn::GetAtt` of an attribute of this resource.
    #[must_use]
    pub fn attribute(&self, attribute: &str) -> Token {
        Token::GetAtt {
            logical_id: self.0.clone(),
            attribute: attribute.to_owned(),
        }
    }
}

impl From<&str> for LogicalId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Deref for LogicalId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
