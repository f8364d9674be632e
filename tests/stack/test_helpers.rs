//! Shared fixtures for stack declaration scenarios.

use metrostack::{DeclaredStack, StackConfig, declare_stack};
use rstest::fixture;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct StackContext {
    pub config: StackConfig,
    pub outcome: Option<DeclareOutcome>,
}

#[derive(Clone, Debug)]
pub enum DeclareOutcome {
    Declared(DeclaredSummary),
    Failed(String),
}

/// What the `then` steps inspect, copied out of the declared stack.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DeclaredSummary {
    pub vpc: String,
    pub public_subnets: Vec<String>,
    pub first_public_subnet_id: String,
    pub selected_subnet: String,
    pub instance_subnet: String,
    pub instance_vpc: String,
    pub queue_visibility_timeout: Option<u64>,
    pub excluded_characters: Option<String>,
    pub outputs: Vec<String>,
}

impl DeclaredSummary {
    fn from_declared(declared: &DeclaredStack) -> Self {
        let public = declared.network.public_subnets();
        let queue_visibility_timeout = declared
            .stack
            .resource(declared.queue.logical_id())
            .and_then(|queue| queue.property("VisibilityTimeout"))
            .and_then(serde_json::Value::as_u64);
        let excluded_characters = declared
            .stack
            .resource(declared.secret.logical_id())
            .and_then(|secret| secret.property("GenerateSecretString"))
            .and_then(|policy| policy.get("ExcludeCharacters"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);
        Self {
            vpc: declared.network.logical_id().to_string(),
            public_subnets: public.iter().map(|subnet| subnet.name().to_owned()).collect(),
            first_public_subnet_id: public
                .first()
                .map(|subnet| subnet.logical_id().to_string())
                .unwrap_or_default(),
            selected_subnet: declared.public_subnet.logical_id().to_string(),
            instance_subnet: declared.instance.subnet().to_string(),
            instance_vpc: declared.instance.vpc().to_string(),
            queue_visibility_timeout,
            excluded_characters,
            outputs: declared.stack.outputs().keys().cloned().collect(),
        }
    }
}

#[derive(Clone, Debug, Error)]
pub enum StackTestError {
    #[error("invalid stack fixture: {0}")]
    Fixture(String),
}

impl StackContext {
    /// Runs configuration conversion and the declaration pass, capturing
    /// the first error as text.
    pub fn declare(self) -> Self {
        let outcome = self
            .config
            .as_props()
            .map_err(|err| err.to_string())
            .and_then(|props| declare_stack(&props).map_err(|err| err.to_string()));
        Self {
            outcome: Some(match outcome {
                Ok(declared) => DeclareOutcome::Declared(DeclaredSummary::from_declared(&declared)),
                Err(message) => DeclareOutcome::Failed(message),
            }),
            ..self
        }
    }

    pub fn declared(&self) -> Result<&DeclaredSummary, StackTestError> {
        match &self.outcome {
            Some(DeclareOutcome::Declared(summary)) => Ok(summary),
            Some(DeclareOutcome::Failed(message)) => Err(StackTestError::Fixture(format!(
                "expected a declared stack, got failure: {message}"
            ))),
            None => Err(StackTestError::Fixture(String::from(
                "the stack has not been declared",
            ))),
        }
    }
}

#[fixture]
pub fn stack_context_result() -> Result<StackContext, StackTestError> {
    let config = StackConfig::reference();
    config
        .validate()
        .map_err(|err| StackTestError::Fixture(err.to_string()))?;
    Ok(StackContext {
        config,
        outcome: None,
    })
}

#[fixture]
pub fn stack_context(stack_context_result: Result<StackContext, StackTestError>) -> StackContext {
    stack_context_result
        .unwrap_or_else(|err| panic!("stack context fixture should initialise: {err}"))
}
