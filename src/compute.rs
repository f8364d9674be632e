//! Compute instance declaration.
//!
//! An instance is more than the `AWS::EC2::Instance` resource: it also gets a
//! security group in its network, an IAM role and instance profile, and a
//! template parameter that resolves the latest machine image at deploy time.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use crate::network::{Network, Subnet};
use crate::stack::{ConstructPath, LogicalId, Stack, StackError};
use crate::template::{Parameter, Tag, Token};

const IMAGE_PARAMETER_TYPE: &str = "AWS::SSM::Parameter::Value<AWS::EC2::Image::Id>";
const EC2_SERVICE_PRINCIPAL: &str = "ec2.amazonaws.com";

/// Errors raised while declaring an instance.
#[derive(Debug, Error)]
pub enum ComputeError {
    /// Raised when an instance type string cannot be parsed.
    #[error("invalid instance type `{0}`: expected <class>.<size>, for example t2.micro")]
    InvalidInstanceType(String),
    /// Raised when a machine image selector is unknown.
    #[error("unknown machine image `{0}`: expected amazon-linux-2 or amazon-linux-2023")]
    UnknownMachineImage(String),
    /// Raised when the subnet was not declared by the given network.
    #[error("subnet `{subnet}` does not belong to network `{network}`")]
    ForeignSubnet {
        /// Subnet name.
        subnet: String,
        /// Network construct ID.
        network: String,
    },
    /// Raised when registration with the stack fails.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// CPU architecture of an instance class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Architecture {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM (Graviton).
    Arm64,
}

impl Architecture {
    const fn image_suffix(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
        }
    }
}

macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Text used by the provider.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_enum!(
    /// Instance family.
    InstanceClass {
        /// Burstable, previous generation.
        T2 => "t2",
        /// Burstable.
        T3 => "t3",
        /// Burstable, AMD.
        T3a => "t3a",
        /// Burstable, Graviton.
        T4g => "t4g",
        /// General purpose.
        M5 => "m5",
        /// General purpose, Graviton.
        M6g => "m6g",
        /// Compute optimised.
        C5 => "c5",
        /// Memory optimised.
        R5 => "r5",
    }
);

named_enum!(
    /// Instance size within a family.
    InstanceSize {
        /// `nano`.
        Nano => "nano",
        /// `micro`.
        Micro => "micro",
        /// `small`.
        Small => "small",
        /// `medium`.
        Medium => "medium",
        /// `large`.
        Large => "large",
        /// `xlarge`.
        Xlarge => "xlarge",
        /// `2xlarge`.
        Xlarge2 => "2xlarge",
    }
);

impl InstanceClass {
    /// Architecture the family runs on.
    #[must_use]
    pub const fn architecture(self) -> Architecture {
        match self {
            Self::T4g | Self::M6g => Architecture::Arm64,
            Self::T2 | Self::T3 | Self::T3a | Self::M5 | Self::C5 | Self::R5 => {
                Architecture::X86_64
            }
        }
    }
}

/// Instance class and size, such as `t2.micro`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InstanceType {
    /// Family.
    pub class: InstanceClass,
    /// Size.
    pub size: InstanceSize,
}

impl InstanceType {
    /// Combines a class and a size.
    #[must_use]
    pub const fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}

impl FromStr for InstanceType {
    type Err = ComputeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim().to_ascii_lowercase();
        let invalid = || ComputeError::InvalidInstanceType(value.to_owned());
        let (class, size) = normalised.split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            class: InstanceClass::parse(class).ok_or_else(invalid)?,
            size: InstanceSize::parse(size).ok_or_else(invalid)?,
        })
    }
}

/// Machine image resolved at deploy time from a public SSM parameter.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MachineImage {
    /// Latest Amazon Linux 2.
    LatestAmazonLinux2,
    /// Latest Amazon Linux 2023.
    LatestAmazonLinux2023,
}

impl MachineImage {
    /// SSM parameter holding the image ID for the given architecture.
    #[must_use]
    pub fn ssm_parameter(self, architecture: Architecture) -> String {
        let arch = architecture.image_suffix();
        match self {
            Self::LatestAmazonLinux2 => {
                format!("/aws/service/ami-amazon-linux-latest/amzn2-ami-hvm-{arch}-gp2")
            }
            Self::LatestAmazonLinux2023 => {
                format!("/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-{arch}")
            }
        }
    }
}

impl fmt::Display for MachineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LatestAmazonLinux2 => "amazon-linux-2",
            Self::LatestAmazonLinux2023 => "amazon-linux-2023",
        })
    }
}

impl FromStr for MachineImage {
    type Err = ComputeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "amazon-linux-2" | "amzn2" => Ok(Self::LatestAmazonLinux2),
            "amazon-linux-2023" | "al2023" => Ok(Self::LatestAmazonLinux2023),
            _ => Err(ComputeError::UnknownMachineImage(value.to_owned())),
        }
    }
}

/// Inputs for [`Instance::declare`].
#[derive(Clone, Copy, Debug)]
pub struct InstanceProps<'a> {
    /// Network the instance lives in.
    pub network: &'a Network,
    /// Subnet chosen for placement; must belong to `network`.
    pub subnet: &'a Subnet,
    /// Size class.
    pub instance_type: InstanceType,
    /// Image selector.
    pub machine_image: MachineImage,
}

/// Handle to a declared instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instance {
    logical_id: LogicalId,
    security_group: LogicalId,
    role: LogicalId,
    instance_profile: LogicalId,
    image_parameter: LogicalId,
    vpc: LogicalId,
    subnet: LogicalId,
    instance_type: InstanceType,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SecurityGroupProperties {
    group_description: String,
    security_group_egress: Vec<EgressRule>,
    tags: Vec<Tag>,
    vpc_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EgressRule {
    cidr_ip: &'static str,
    description: &'static str,
    ip_protocol: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RoleProperties {
    assume_role_policy_document: Value,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceProfileProperties {
    roles: Vec<Token>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InstanceProperties {
    availability_zone: Token,
    iam_instance_profile: Token,
    image_id: Token,
    instance_type: String,
    security_group_ids: Vec<Token>,
    subnet_id: Token,
    tags: Vec<Tag>,
}

impl Instance {
    /// Declares the instance and its supporting resources.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::ForeignSubnet`] when the subnet was not
    /// declared by the network, or [`ComputeError::Stack`] when registration
    /// fails.
    pub fn declare(
        stack: &mut Stack,
        id: &str,
        props: &InstanceProps<'_>,
    ) -> Result<Self, ComputeError> {
        if !props.network.owns_subnet(props.subnet) {
            return Err(ComputeError::ForeignSubnet {
                subnet: props.subnet.name().to_owned(),
                network: props.network.name().to_owned(),
            });
        }

        let root = ConstructPath::root(id)?;
        let instance_path = stack.node_path(&root);

        let sg_node = root.child("InstanceSecurityGroup")?;
        let sg_description = stack.node_path(&sg_node);
        let security_group = stack.add(
            &sg_node.child("Resource")?,
            "AWS::EC2::SecurityGroup",
            &SecurityGroupProperties {
                group_description: sg_description,
                security_group_egress: vec![EgressRule {
                    cidr_ip: "0.0.0.0/0",
                    description: "Allow all outbound traffic by default",
                    ip_protocol: "-1",
                }],
                tags: vec![Tag::name(instance_path.clone())],
                vpc_id: props.network.vpc_id(),
            },
            |resource| resource,
        )?;

        let role = stack.add(
            &root.child("InstanceRole")?.child("Resource")?,
            "AWS::IAM::Role",
            &RoleProperties {
                assume_role_policy_document: json!({
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": EC2_SERVICE_PRINCIPAL },
                    }],
                    "Version": "2012-10-17",
                }),
                tags: vec![Tag::name(instance_path.clone())],
            },
            |resource| resource,
        )?;

        let instance_profile = stack.add(
            &root.child("InstanceProfile")?,
            "AWS::IAM::InstanceProfile",
            &InstanceProfileProperties {
                roles: vec![role.reference()],
            },
            |resource| resource,
        )?;

        let ssm_path = props
            .machine_image
            .ssm_parameter(props.instance_type.class.architecture());
        let parameter_id: String = ssm_path
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        let image_parameter = ConstructPath::root(&format!("SsmParameterValue{parameter_id}"))?
            .child("Parameter")?
            .logical_id();
        let image_id = stack.add_parameter(
            &image_parameter,
            Parameter {
                type_name: String::from(IMAGE_PARAMETER_TYPE),
                default: Some(ssm_path),
                description: None,
            },
        )?;

        let logical_id = stack.add(
            &root.child("Resource")?,
            "AWS::EC2::Instance",
            &InstanceProperties {
                availability_zone: props.subnet.availability_zone(),
                iam_instance_profile: instance_profile.reference(),
                image_id,
                instance_type: props.instance_type.to_string(),
                security_group_ids: vec![security_group.attribute("GroupId")],
                subnet_id: props.subnet.subnet_id(),
                tags: vec![Tag::name(instance_path)],
            },
            |resource| {
                props
                    .subnet
                    .default_route()
                    .into_iter()
                    .fold(resource.depends_on(role.to_string()), |acc, route| {
                        acc.depends_on(route.to_string())
                    })
            },
        )?;

        info!(
            instance = id,
            instance_type = %props.instance_type,
            image = %props.machine_image,
            subnet = props.subnet.name(),
            "declared instance"
        );
        Ok(Self {
            logical_id,
            security_group,
            role,
            instance_profile,
            image_parameter,
            vpc: props.network.logical_id().clone(),
            subnet: props.subnet.logical_id().clone(),
            instance_type: props.instance_type,
        })
    }

    /// Template key of the instance resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Resolves to the instance ID.
    #[must_use]
    pub fn instance_id(&self) -> Token {
        self.logical_id.reference()
    }

    /// Template key of the instance security group.
    #[must_use]
    pub const fn security_group(&self) -> &LogicalId {
        &self.security_group
    }

    /// Template key of the instance role.
    #[must_use]
    pub const fn role(&self) -> &LogicalId {
        &self.role
    }

    /// Template key of the instance profile.
    #[must_use]
    pub const fn instance_profile(&self) -> &LogicalId {
        &self.instance_profile
    }

    /// Template key of the image parameter.
    #[must_use]
    pub const fn image_parameter(&self) -> &LogicalId {
        &self.image_parameter
    }

    /// Template key of the VPC the instance was placed in.
    #[must_use]
    pub const fn vpc(&self) -> &LogicalId {
        &self.vpc
    }

    /// Template key of the subnet the instance was placed in.
    #[must_use]
    pub const fn subnet(&self) -> &LogicalId {
        &self.subnet
    }

    /// Size class.
    #[must_use]
    pub const fn instance_type(&self) -> InstanceType {
        self.instance_type
    }
}
