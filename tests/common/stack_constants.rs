//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Shared values live under `tests/common/` and are pulled in with:
//!
//! ```rust
//! #[path = "common/stack_constants.rs"]
//! mod stack_constants;
//! ```

/// Stack name used when no override is configured.
pub const DEFAULT_STACK_NAME: &str = "CdkStack";

/// File the reference stack is synthesized into.
pub const DEFAULT_TEMPLATE_FILE: &str = "CdkStack.template.json";

/// Output names of the reference stack, sorted as they appear in templates.
pub const REFERENCE_OUTPUTS: [&str; 5] =
    ["EC2InstanceId", "QueueUrl", "SecretArn", "TopicArn", "VpcId"];
