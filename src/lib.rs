//! Core library for the metrostack infrastructure declaration.
//!
//! The crate declares a small cloud stack (a network, an instance in its
//! first public subnet, a queue, a topic and a generated secret) as a typed
//! resource graph and synthesizes it into a CloudFormation template. Nothing
//! here talks to the provider: the template is handed to the deployment
//! engine, which performs the provisioning.

pub mod cidr;
pub mod compute;
pub mod config;
pub mod definition;
pub mod network;
pub mod queue;
pub mod secret;
pub mod stack;
pub mod synth;
#[cfg(test)]
pub mod test_helpers;
pub mod template;
pub mod topic;

pub use cidr::{CidrError, Ipv4Cidr, SubnetAllocator};
pub use compute::{
    Architecture, ComputeError, Instance, InstanceClass, InstanceProps, InstanceSize,
    InstanceType, MachineImage,
};
pub use config::{ConfigError, DEFAULT_OUTPUT_DIR, StackConfig};
pub use definition::{DeclaredStack, DefinitionError, StackProps, declare_stack};
pub use network::{Network, NetworkError, NetworkProps, Subnet, SubnetGroup, SubnetKind};
pub use queue::{Queue, QueueError, QueueProps};
pub use secret::{Secret, SecretError, SecretGenerator, SecretProps, SecretTemplate};
pub use stack::{ConstructPath, LogicalId, Stack, StackError};
pub use synth::{SynthError, render_template, resource_listing, write_template};
pub use template::{Output, Parameter, RemovalPolicy, Resource, Template, Token};
pub use topic::{Topic, TopicError, TopicProps};
