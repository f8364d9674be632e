//! BDD scenarios for the stack declaration.

use rstest_bdd_macros::scenario;

use super::test_helpers::{StackContext, stack_context};

#[scenario(
    path = "tests/features/stack.feature",
    name = "Declare the reference stack"
)]
fn scenario_reference_stack(stack_context: StackContext) {
    drop(stack_context);
}

#[scenario(
    path = "tests/features/stack.feature",
    name = "Spread the network over three zones"
)]
fn scenario_three_zones(stack_context: StackContext) {
    drop(stack_context);
}

#[scenario(
    path = "tests/features/stack.feature",
    name = "Reject a public network range"
)]
fn scenario_public_range(stack_context: StackContext) {
    drop(stack_context);
}

#[scenario(
    path = "tests/features/stack.feature",
    name = "Reject a range with host bits set"
)]
fn scenario_host_bits(stack_context: StackContext) {
    drop(stack_context);
}

#[scenario(
    path = "tests/features/stack.feature",
    name = "Reject a zero visibility timeout"
)]
fn scenario_zero_timeout(stack_context: StackContext) {
    drop(stack_context);
}

#[scenario(
    path = "tests/features/stack.feature",
    name = "Reject an unknown instance type"
)]
fn scenario_unknown_instance_type(stack_context: StackContext) {
    drop(stack_context);
}
