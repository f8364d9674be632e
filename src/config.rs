//! Configuration loading via `ortho-config`.
//!
//! Every input of the stack definition can be overridden, but the defaults
//! reproduce the fixed deployment exactly, so an empty configuration
//! synthesizes the reference stack.

use std::str::FromStr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::cidr::Ipv4Cidr;
use crate::compute::{InstanceType, MachineImage};
use crate::definition::{SECRET_EXCLUDE_CHARACTERS, SECRET_NAME, STACK_NAME, StackProps};

/// Default directory synthesized templates are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "cdk.out";

/// Stack inputs derived from defaults, configuration files and environment
/// variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "METROSTACK",
    discovery(
        app_name = "metrostack",
        env_var = "METROSTACK_CONFIG_PATH",
        config_file_name = "metrostack.toml",
        dotfile_name = ".metrostack.toml",
        project_file_name = "metrostack.toml"
    )
)]
pub struct StackConfig {
    /// Stack name handed to the deployment engine.
    #[ortho_config(default = STACK_NAME.to_owned())]
    pub stack_name: String,
    /// Optional template description.
    pub description: Option<String>,
    /// Network address range.
    #[ortho_config(default = "10.30.0.0/16".to_owned())]
    pub vpc_cidr: String,
    /// Number of availability zones.
    #[ortho_config(default = 2)]
    pub max_azs: u8,
    /// NAT gateway count; one per zone when unset.
    pub nat_gateways: Option<u8>,
    /// Instance type such as `t2.micro`.
    #[ortho_config(default = "t2.micro".to_owned())]
    pub instance_type: String,
    /// `amazon-linux-2` or `amazon-linux-2023`.
    #[ortho_config(default = "amazon-linux-2".to_owned())]
    pub machine_image: String,
    /// Queue visibility timeout in seconds.
    #[ortho_config(default = 300)]
    pub queue_visibility_timeout_secs: u64,
    /// Display name for topic subscriptions.
    pub topic_display_name: Option<String>,
    /// Physical secret name.
    #[ortho_config(default = SECRET_NAME.to_owned())]
    pub secret_name: String,
    /// Characters the generated password must avoid.
    #[ortho_config(default = SECRET_EXCLUDE_CHARACTERS.to_owned())]
    pub secret_exclude_characters: String,
    /// Generated password length; the provider default applies when unset.
    pub secret_password_length: Option<u16>,
    /// Directory `synth` writes templates to.
    #[ortho_config(default = DEFAULT_OUTPUT_DIR.to_owned())]
    pub output_dir: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to metrostack.toml",
            self.env_var, self.toml_key
        )
    }
}

const STACK_NAME_FIELD: FieldMetadata =
    FieldMetadata::new("stack name", "METROSTACK_STACK_NAME", "stack_name");
const VPC_CIDR_FIELD: FieldMetadata =
    FieldMetadata::new("network CIDR block", "METROSTACK_VPC_CIDR", "vpc_cidr");
const INSTANCE_TYPE_FIELD: FieldMetadata = FieldMetadata::new(
    "instance type",
    "METROSTACK_INSTANCE_TYPE",
    "instance_type",
);
const MACHINE_IMAGE_FIELD: FieldMetadata = FieldMetadata::new(
    "machine image",
    "METROSTACK_MACHINE_IMAGE",
    "machine_image",
);
const SECRET_NAME_FIELD: FieldMetadata =
    FieldMetadata::new("secret name", "METROSTACK_SECRET_NAME", "secret_name");
const OUTPUT_DIR_FIELD: FieldMetadata =
    FieldMetadata::new("output directory", "METROSTACK_OUTPUT_DIR", "output_dir");

impl StackConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn parse_field<T>(value: &str, metadata: &FieldMetadata) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value.parse().map_err(|err: T::Err| ConfigError::Invalid {
            field: metadata.toml_key,
            message: format!("{err}; {}", metadata.hint()),
        })
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("metrostack")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(&self.stack_name, &STACK_NAME_FIELD)?;
        Self::require_field(&self.vpc_cidr, &VPC_CIDR_FIELD)?;
        Self::require_field(&self.instance_type, &INSTANCE_TYPE_FIELD)?;
        Self::require_field(&self.machine_image, &MACHINE_IMAGE_FIELD)?;
        Self::require_field(&self.secret_name, &SECRET_NAME_FIELD)?;
        Self::require_field(&self.output_dir, &OUTPUT_DIR_FIELD)?;
        Ok(())
    }

    /// Builds the stack definition inputs. Values the configuration does not
    /// cover (subnet layout, secret template) keep the reference settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for empty required fields and
    /// [`ConfigError::Invalid`] for values that do not parse.
    pub fn as_props(&self) -> Result<StackProps, ConfigError> {
        self.validate()?;
        let cidr: Ipv4Cidr = Self::parse_field(&self.vpc_cidr, &VPC_CIDR_FIELD)?;
        let instance_type: InstanceType =
            Self::parse_field(&self.instance_type, &INSTANCE_TYPE_FIELD)?;
        let machine_image: MachineImage =
            Self::parse_field(&self.machine_image, &MACHINE_IMAGE_FIELD)?;

        let mut props = StackProps::reference();
        props.stack_name = self.stack_name.trim().to_owned();
        props.description.clone_from(&self.description);
        props.network.cidr = cidr;
        props.network.max_azs = self.max_azs;
        props.network.nat_gateways = self.nat_gateways;
        props.instance_type = instance_type;
        props.machine_image = machine_image;
        props.queue.visibility_timeout = Duration::from_secs(self.queue_visibility_timeout_secs);
        props.topic.display_name.clone_from(&self.topic_display_name);
        props.secret.name = self.secret_name.trim().to_owned();
        props
            .secret
            .generator
            .exclude_characters
            .clone_from(&self.secret_exclude_characters);
        props.secret.generator.password_length = self.secret_password_length;
        Ok(props)
    }
}

impl StackConfig {
    /// The values an empty configuration resolves to.
    #[must_use]
    pub fn reference() -> Self {
        Self {
            stack_name: STACK_NAME.to_owned(),
            description: None,
            vpc_cidr: String::from("10.30.0.0/16"),
            max_azs: 2,
            nat_gateways: None,
            instance_type: String::from("t2.micro"),
            machine_image: String::from("amazon-linux-2"),
            queue_visibility_timeout_secs: 300,
            topic_display_name: None,
            secret_name: SECRET_NAME.to_owned(),
            secret_exclude_characters: SECRET_EXCLUDE_CHARACTERS.to_owned(),
            secret_password_length: None,
            output_dir: DEFAULT_OUTPUT_DIR.to_owned(),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value could not be interpreted.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// Configuration key.
        field: &'static str,
        /// Parser message with guidance.
        message: String,
    },
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
