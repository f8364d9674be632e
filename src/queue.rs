//! Message queue declaration.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::stack::{ConstructPath, LogicalId, Stack, StackError};
use crate::template::{RemovalPolicy, Token};

/// Longest visibility timeout the provider accepts (12 hours).
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Errors raised while declaring a queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Raised when the visibility timeout is zero, fractional, or too long.
    #[error(
        "visibility timeout must be a whole number of seconds between 1 and {max}, got {got:?}",
        max = MAX_VISIBILITY_TIMEOUT.as_secs()
    )]
    VisibilityTimeout {
        /// Rejected value.
        got: Duration,
    },
    /// Raised when registration with the stack fails.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Inputs for [`Queue::declare`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct QueueProps {
    /// How long a received message stays hidden from other consumers.
    pub visibility_timeout: Duration,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct QueueProperties {
    visibility_timeout: u64,
}

/// Handle to a declared queue.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Queue {
    logical_id: LogicalId,
    visibility_timeout: Duration,
}

impl Queue {
    /// Declares a standard queue. The queue is deleted with the stack.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::VisibilityTimeout`] for out-of-range timeouts and
    /// [`QueueError::Stack`] when registration fails.
    pub fn declare(stack: &mut Stack, id: &str, props: &QueueProps) -> Result<Self, QueueError> {
        let timeout = props.visibility_timeout;
        if timeout.is_zero() || timeout.subsec_nanos() != 0 || timeout > MAX_VISIBILITY_TIMEOUT {
            return Err(QueueError::VisibilityTimeout { got: timeout });
        }

        let logical_id = stack.add(
            &ConstructPath::root(id)?.child("Resource")?,
            "AWS::SQS::Queue",
            &QueueProperties {
                visibility_timeout: timeout.as_secs(),
            },
            |resource| resource.removal_policy(RemovalPolicy::Delete),
        )?;
        info!(queue = id, visibility_timeout_secs = timeout.as_secs(), "declared queue");

        Ok(Self {
            logical_id,
            visibility_timeout: timeout,
        })
    }

    /// Template key of the queue resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Resolves to the queue URL (the queue's `Ref`).
    #[must_use]
    pub fn queue_url(&self) -> Token {
        self.logical_id.reference()
    }

    /// Visibility timeout the queue was declared with.
    #[must_use]
    pub const fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }
}
