//! Notification topic declaration.

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::stack::{ConstructPath, LogicalId, Stack, StackError};
use crate::template::Token;

const MAX_DISPLAY_NAME_LEN: usize = 100;

/// Errors raised while declaring a topic.
#[derive(Debug, Error)]
pub enum TopicError {
    /// Raised when the display name is longer than 100 characters.
    #[error("topic display name must be at most {max} characters", max = MAX_DISPLAY_NAME_LEN)]
    DisplayNameTooLong,
    /// Raised when registration with the stack fails.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Inputs for [`Topic::declare`]. A topic needs nothing beyond its identity.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TopicProps {
    /// Name shown in SMS and email subscriptions.
    pub display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TopicProperties<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

/// Handle to a declared topic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Topic {
    logical_id: LogicalId,
}

impl Topic {
    /// Declares a standard topic.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::DisplayNameTooLong`] for long display names and
    /// [`TopicError::Stack`] when registration fails.
    pub fn declare(stack: &mut Stack, id: &str, props: &TopicProps) -> Result<Self, TopicError> {
        if props
            .display_name
            .as_ref()
            .is_some_and(|name| name.chars().count() > MAX_DISPLAY_NAME_LEN)
        {
            return Err(TopicError::DisplayNameTooLong);
        }

        let logical_id = stack.add(
            &ConstructPath::root(id)?.child("Resource")?,
            "AWS::SNS::Topic",
            &TopicProperties {
                display_name: props.display_name.as_deref(),
            },
            |resource| resource,
        )?;
        info!(topic = id, "declared topic");
        Ok(Self { logical_id })
    }

    /// Template key of the topic resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Resolves to the topic ARN (the topic's `Ref`).
    #[must_use]
    pub fn topic_arn(&self) -> Token {
        self.logical_id.reference()
    }
}
