//! Property-based tests for network carving, logical IDs and declaration
//! determinism.

mod declaration;
mod logical_ids;
