//! The stack definition: one linear declaration pass.
//!
//! Declares the network, selects its first public subnet, places an instance
//! there, declares the queue, topic and secret, then projects their
//! identifiers into the five named outputs. Every handle is produced once
//! and only borrowed afterwards.

use std::net::Ipv4Addr;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use crate::cidr::Ipv4Cidr;
use crate::compute::{
    ComputeError, Instance, InstanceClass, InstanceProps, InstanceSize, InstanceType, MachineImage,
};
use crate::network::{Network, NetworkError, NetworkProps, Subnet};
use crate::queue::{Queue, QueueError, QueueProps};
use crate::secret::{Secret, SecretError, SecretGenerator, SecretProps, SecretTemplate};
use crate::stack::{Stack, StackError};
use crate::topic::{Topic, TopicError, TopicProps};

/// Default stack name.
pub const STACK_NAME: &str = "CdkStack";
/// Construct ID of the network.
pub const VPC_ID: &str = "MyVpc";
/// Construct ID of the instance.
pub const INSTANCE_ID: &str = "MyEC2Instance";
/// Construct ID of the queue.
pub const QUEUE_ID: &str = "MyQueue";
/// Construct ID of the topic.
pub const TOPIC_ID: &str = "MyTopic";
/// Construct ID of the secret.
pub const SECRET_ID: &str = "MySecret";

/// Output carrying the network identifier.
pub const OUTPUT_VPC_ID: &str = "VpcId";
/// Output carrying the instance identifier.
pub const OUTPUT_INSTANCE_ID: &str = "EC2InstanceId";
/// Output carrying the queue URL.
pub const OUTPUT_QUEUE_URL: &str = "QueueUrl";
/// Output carrying the topic ARN.
pub const OUTPUT_TOPIC_ARN: &str = "TopicArn";
/// Output carrying the secret ARN.
pub const OUTPUT_SECRET_ARN: &str = "SecretArn";

/// Default secret name.
pub const SECRET_NAME: &str = "metrodb-secrets";
/// Characters the generated password must avoid by default.
pub const SECRET_EXCLUDE_CHARACTERS: &str = "\"@/\\";
/// Template field that receives the generated password.
pub const SECRET_GENERATE_KEY: &str = "password";
/// Default queue visibility timeout.
pub const QUEUE_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors raised while declaring the stack.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Stack registration failed.
    #[error(transparent)]
    Stack(#[from] StackError),
    /// Network declaration or subnet selection failed.
    #[error("network `{id}`: {0}", id = VPC_ID)]
    Network(#[from] NetworkError),
    /// Instance declaration failed.
    #[error("instance `{id}`: {0}", id = INSTANCE_ID)]
    Compute(#[from] ComputeError),
    /// Queue declaration failed.
    #[error("queue `{id}`: {0}", id = QUEUE_ID)]
    Queue(#[from] QueueError),
    /// Topic declaration failed.
    #[error("topic `{id}`: {0}", id = TOPIC_ID)]
    Topic(#[from] TopicError),
    /// Secret declaration failed.
    #[error("secret `{id}`: {0}", id = SECRET_ID)]
    Secret(#[from] SecretError),
}

/// Inputs for [`declare_stack`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StackProps {
    /// Stack name as the deployment engine sees it.
    pub stack_name: String,
    /// Template description.
    pub description: Option<String>,
    /// Network range, zones and subnet layout.
    pub network: NetworkProps,
    /// Instance size.
    pub instance_type: InstanceType,
    /// Instance image.
    pub machine_image: MachineImage,
    /// Queue settings.
    pub queue: QueueProps,
    /// Topic settings.
    pub topic: TopicProps,
    /// Secret name and generation policy.
    pub secret: SecretProps,
}

impl StackProps {
    /// The fixed deployment: `10.30.0.0/16` over two zones, a `t2.micro`
    /// running the latest Amazon Linux 2, a 300 second queue, a bare topic
    /// and the `metrodb-secrets` secret.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            stack_name: String::from(STACK_NAME),
            description: None,
            network: NetworkProps::new(
                Ipv4Cidr::from_parts_unchecked(Ipv4Addr::new(10, 30, 0, 0), 16),
                2,
            ),
            instance_type: InstanceType::of(InstanceClass::T2, InstanceSize::Micro),
            machine_image: MachineImage::LatestAmazonLinux2,
            queue: QueueProps {
                visibility_timeout: QUEUE_VISIBILITY_TIMEOUT,
            },
            topic: TopicProps::default(),
            secret: SecretProps {
                name: String::from(SECRET_NAME),
                description: None,
                generator: SecretGenerator {
                    template: credentials_template(),
                    generate_key: String::from(SECRET_GENERATE_KEY),
                    exclude_characters: String::from(SECRET_EXCLUDE_CHARACTERS),
                    password_length: None,
                },
            },
        }
    }
}

/// The `{"username":"","password":""}` template the secret starts from.
#[must_use]
pub fn credentials_template() -> SecretTemplate {
    SecretTemplate::new()
        .field("username", "")
        .field(SECRET_GENERATE_KEY, "")
}

/// The declared stack together with every handle the pass produced.
#[derive(Clone, Debug)]
pub struct DeclaredStack {
    /// Registry holding resources, parameters and outputs.
    pub stack: Stack,
    /// Network handle.
    pub network: Network,
    /// Subnet the instance was placed in.
    pub public_subnet: Subnet,
    /// Instance handle.
    pub instance: Instance,
    /// Queue handle.
    pub queue: Queue,
    /// Topic handle.
    pub topic: Topic,
    /// Secret handle.
    pub secret: Secret,
}

/// Runs the declaration pass.
///
/// # Errors
///
/// Returns [`DefinitionError`] naming the construct whose declaration
/// failed. Nothing is returned for a partially declared stack.
pub fn declare_stack(props: &StackProps) -> Result<DeclaredStack, DefinitionError> {
    let mut stack = Stack::new(&props.stack_name)?;
    if let Some(description) = &props.description {
        stack = stack.with_description(description.clone());
    }

    let network = Network::declare(&mut stack, VPC_ID, &props.network)?;
    let public_subnet = network.first_public_subnet()?.clone();
    let instance = Instance::declare(
        &mut stack,
        INSTANCE_ID,
        &InstanceProps {
            network: &network,
            subnet: &public_subnet,
            instance_type: props.instance_type,
            machine_image: props.machine_image,
        },
    )?;
    let queue = Queue::declare(&mut stack, QUEUE_ID, &props.queue)?;
    let topic = Topic::declare(&mut stack, TOPIC_ID, &props.topic)?;
    let secret = Secret::declare(&mut stack, SECRET_ID, &props.secret)?;

    stack.add_output(OUTPUT_VPC_ID, network.vpc_id(), None)?;
    stack.add_output(OUTPUT_INSTANCE_ID, instance.instance_id(), None)?;
    stack.add_output(OUTPUT_QUEUE_URL, queue.queue_url(), None)?;
    stack.add_output(OUTPUT_TOPIC_ARN, topic.topic_arn(), None)?;
    stack.add_output(OUTPUT_SECRET_ARN, secret.secret_arn(), None)?;

    info!(
        stack = %props.stack_name,
        resources = stack.resources().len(),
        outputs = stack.outputs().len(),
        "declared stack"
    );

    Ok(DeclaredStack {
        stack,
        network,
        public_subnet,
        instance,
        queue,
        topic,
        secret,
    })
}
