//! Values the deployment engine resolves at apply time.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

/// A template value that is either a literal or an intrinsic function the
/// deployment engine evaluates once resources exist.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Token {
    /// A plain string.
    Literal(String),
    /// `{"Ref": id}`: the primary identifier of a resource or a parameter's
    /// value.
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`.
    GetAtt {
        /// Logical ID of the resource.
        logical_id: String,
        /// Attribute name such as `Arn`.
        attribute: String,
    },
    /// `{"Fn::Select": [index, {"Fn::GetAZs": ""}]}`: the n-th availability
    /// zone of the region the stack is deployed to.
    AvailabilityZone(u8),
}

impl Token {
    /// Builds a literal token.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Renders the token as template JSON.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(value) => Value::String(value.clone()),
            Self::Ref(id) => json!({ "Ref": id }),
            Self::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
            Self::AvailabilityZone(index) => {
                json!({ "Fn::Select": [index, { "Fn::GetAZs": "" }] })
            }
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.write_str(value),
            Self::Ref(id) => write!(f, "${{{id}}}"),
            Self::GetAtt {
                logical_id,
                attribute,
            } => write!(f, "${{{logical_id}.{attribute}}}"),
            Self::AvailabilityZone(index) => write!(f, "${{AZ[{index}]}}"),
        }
    }
}
