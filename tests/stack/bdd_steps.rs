//! BDD step definitions for declaring the stack.

use metrostack::definition::SECRET_EXCLUDE_CHARACTERS;
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{DeclareOutcome, StackContext, StackTestError};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error(transparent)]
    Setup(#[from] StackTestError),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("the reference stack configuration")]
fn reference_configuration(stack_context: StackContext) -> StackContext {
    stack_context
}

#[given("the network spans \"{zones}\" zones")]
fn network_spans_zones(mut stack_context: StackContext, zones: u8) -> StackContext {
    stack_context.config.max_azs = zones;
    stack_context
}

#[given("the network range is \"{cidr}\"")]
fn network_range(mut stack_context: StackContext, cidr: String) -> StackContext {
    stack_context.config.vpc_cidr = cidr;
    stack_context
}

#[given("the queue visibility timeout is set to \"{seconds}\" seconds")]
fn queue_timeout(mut stack_context: StackContext, seconds: u64) -> StackContext {
    stack_context.config.queue_visibility_timeout_secs = seconds;
    stack_context
}

#[given("the instance type is \"{instance_type}\"")]
fn configured_instance_type(
    mut stack_context: StackContext,
    instance_type: String,
) -> StackContext {
    stack_context.config.instance_type = instance_type;
    stack_context
}

#[when("I declare the stack")]
fn declare(stack_context: StackContext) -> Result<StackContext, StepError> {
    Ok(stack_context.declare())
}

#[then("the declaration succeeds")]
fn declaration_succeeds(stack_context: &StackContext) -> Result<(), StepError> {
    stack_context.declared()?;
    Ok(())
}

#[then("the declaration fails mentioning \"{snippet}\"")]
fn declaration_fails(stack_context: &StackContext, snippet: String) -> Result<(), StepError> {
    match &stack_context.outcome {
        Some(DeclareOutcome::Failed(message)) if message.contains(&snippet) => Ok(()),
        Some(DeclareOutcome::Failed(message)) => Err(StepError::Assertion(format!(
            "expected failure mentioning `{snippet}`, got: {message}"
        ))),
        Some(DeclareOutcome::Declared(_)) => Err(StepError::Assertion(String::from(
            "expected the declaration to fail",
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the network has \"{count}\" public subnets")]
fn public_subnet_count(stack_context: &StackContext, count: usize) -> Result<(), StepError> {
    let declared = stack_context.declared()?;
    let actual = declared.public_subnets.len();
    if actual == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} public subnets, got {actual}: {:?}",
            declared.public_subnets
        )))
    }
}

#[then("the instance is placed in the first public subnet")]
fn instance_in_first_public_subnet(stack_context: &StackContext) -> Result<(), StepError> {
    let declared = stack_context.declared()?;
    if declared.first_public_subnet_id.is_empty() {
        return Err(StepError::Assertion(String::from("network has no public subnets")));
    }
    if declared.selected_subnet != declared.first_public_subnet_id {
        return Err(StepError::Assertion(format!(
            "selected subnet {} is not the first public subnet {}",
            declared.selected_subnet, declared.first_public_subnet_id
        )));
    }
    if declared.instance_subnet != declared.first_public_subnet_id {
        return Err(StepError::Assertion(format!(
            "instance references {} instead of {}",
            declared.instance_subnet, declared.first_public_subnet_id
        )));
    }
    if declared.instance_vpc != declared.vpc {
        return Err(StepError::Assertion(String::from(
            "instance references a different network",
        )));
    }
    Ok(())
}

#[then("the queue visibility timeout is \"{seconds}\" seconds")]
fn queue_timeout_rendered(stack_context: &StackContext, seconds: u64) -> Result<(), StepError> {
    let rendered = stack_context.declared()?.queue_visibility_timeout;
    if rendered == Some(seconds) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected visibility timeout {seconds}, got {rendered:?}"
        )))
    }
}

#[then("the secret policy excludes the default characters")]
fn secret_excludes_defaults(stack_context: &StackContext) -> Result<(), StepError> {
    let excluded = stack_context.declared()?.excluded_characters.as_deref();
    if excluded == Some(SECRET_EXCLUDE_CHARACTERS) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected excluded characters {SECRET_EXCLUDE_CHARACTERS:?}, got {excluded:?}"
        )))
    }
}

#[then("the outputs are \"{names}\"")]
fn outputs_are(stack_context: &StackContext, names: String) -> Result<(), StepError> {
    let actual = &stack_context.declared()?.outputs;
    let expected: Vec<&str> = names.split(',').collect();
    if *actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected outputs {expected:?}, got {actual:?}"
        )))
    }
}
