//! Step definitions, fixtures and scenarios for declaring the stack.

mod bdd_steps;
mod scenarios;
mod test_helpers;
