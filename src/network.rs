//! Virtual network declaration.
//!
//! [`Network::declare`] expands a CIDR range and a zone count into the VPC,
//! one subnet per zone for every [`SubnetGroup`], the route tables that tie
//! them together, an internet gateway for public groups, and NAT gateways for
//! private groups that need egress.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::cidr::{CidrError, Ipv4Cidr, MAX_SUBNET_PREFIX, SubnetAllocator};
use crate::stack::{ConstructPath, LogicalId, Stack, StackError};
use crate::template::{Tag, Token};

/// Widest VPC range the provider accepts.
pub const MIN_VPC_PREFIX: u8 = 16;
/// Narrowest VPC range the provider accepts.
pub const MAX_VPC_PREFIX: u8 = MAX_SUBNET_PREFIX;

const ANY_IPV4: &str = "0.0.0.0/0";
const SUBNET_NAME_TAG: &str = "aws-cdk:subnet-name";
const SUBNET_TYPE_TAG: &str = "aws-cdk:subnet-type";

/// Errors raised while declaring a network.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Raised when the address range is not RFC 1918 space.
    #[error("network range {0} is not a private (RFC 1918) range")]
    NotPrivate(Ipv4Cidr),
    /// Raised when the range is too wide or too narrow for a VPC.
    #[error(
        "network range {cidr} must have a prefix between /{min} and /{max}",
        min = MIN_VPC_PREFIX,
        max = MAX_VPC_PREFIX
    )]
    PrefixOutOfRange {
        /// Offending range.
        cidr: Ipv4Cidr,
    },
    /// Raised when zero availability zones are requested.
    #[error("a network needs at least one availability zone")]
    NoZones,
    /// Raised when no subnet groups are configured.
    #[error("a network needs at least one subnet group")]
    NoSubnetGroups,
    /// Raised when a subnet group name is empty or not alphanumeric.
    #[error("invalid subnet group name `{0}`: use letters and digits only")]
    InvalidGroupName(String),
    /// Raised when two subnet groups share a name.
    #[error("subnet group `{0}` is configured more than once")]
    DuplicateGroupName(String),
    /// Raised when a group mask does not fit inside the network range.
    #[error(
        "subnet group `{group}` mask /{mask} must be between /{min} and /{max}",
        max = MAX_SUBNET_PREFIX
    )]
    InvalidCidrMask {
        /// Group name.
        group: String,
        /// Requested mask.
        mask: u8,
        /// Smallest acceptable mask for the network.
        min: u8,
    },
    /// Raised when more NAT gateways than zones are requested.
    #[error("{requested} NAT gateways requested but the network only spans {zones} zones")]
    TooManyNatGateways {
        /// Requested NAT gateway count.
        requested: u8,
        /// Zone count.
        zones: u8,
    },
    /// Raised when NAT gateways are requested without a public group to host
    /// them.
    #[error("NAT gateways need a public subnet group to live in")]
    NatWithoutPublicSubnets,
    /// Raised when a private-with-egress group has no NAT gateway to route
    /// through.
    #[error("subnet group `{0}` needs egress but the network has no NAT gateways")]
    EgressWithoutNat(String),
    /// Raised when selecting a public subnet from a network that has none.
    #[error("network `{0}` has no public subnets")]
    NoPublicSubnet(String),
    /// Raised when the range cannot hold every subnet.
    #[error(transparent)]
    Cidr(#[from] CidrError),
    /// Raised when registration with the stack fails.
    #[error(transparent)]
    Stack(#[from] StackError),
}

/// Routing behaviour of a subnet group.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum SubnetKind {
    /// Routed to the internet gateway; instances may get public addresses.
    Public,
    /// Outbound-only internet access through a NAT gateway.
    PrivateWithEgress,
    /// No route outside the network.
    Isolated,
}

impl SubnetKind {
    /// Label used in subnet tags.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithEgress => "Private",
            Self::Isolated => "Isolated",
        }
    }
}

/// A named set of subnets, one per availability zone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubnetGroup {
    /// Group name; subnets are named `<name>Subnet<n>`.
    pub name: String,
    /// Routing behaviour.
    pub kind: SubnetKind,
    /// Fixed prefix length; groups without one share the remaining space.
    pub cidr_mask: Option<u8>,
}

impl SubnetGroup {
    /// Builds a group that shares the remaining address space.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: SubnetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            cidr_mask: None,
        }
    }

    /// Pins the group's subnets to a prefix length.
    #[must_use]
    pub const fn with_cidr_mask(mut self, mask: u8) -> Self {
        self.cidr_mask = Some(mask);
        self
    }
}

/// Inputs for [`Network::declare`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkProps {
    /// Address range of the whole network.
    pub cidr: Ipv4Cidr,
    /// Number of availability zones to spread subnets over.
    pub max_azs: u8,
    /// NAT gateway count; defaults to one per zone when a group needs egress.
    pub nat_gateways: Option<u8>,
    /// Subnet groups in declaration order.
    pub subnet_groups: Vec<SubnetGroup>,
}

impl NetworkProps {
    /// A network with one public and one private-with-egress group.
    #[must_use]
    pub fn new(cidr: Ipv4Cidr, max_azs: u8) -> Self {
        Self {
            cidr,
            max_azs,
            nat_gateways: None,
            subnet_groups: vec![
                SubnetGroup::new("Public", SubnetKind::Public),
                SubnetGroup::new("Private", SubnetKind::PrivateWithEgress),
            ],
        }
    }

    fn has(&self, kind: SubnetKind) -> bool {
        self.subnet_groups.iter().any(|group| group.kind == kind)
    }

    fn nat_gateway_count(&self) -> u8 {
        self.nat_gateways.unwrap_or_else(|| {
            if self.has(SubnetKind::PrivateWithEgress) {
                self.max_azs
            } else {
                0
            }
        })
    }

    fn validate(&self) -> Result<u8, NetworkError> {
        if !self.cidr.is_private() {
            return Err(NetworkError::NotPrivate(self.cidr));
        }
        if !(MIN_VPC_PREFIX..=MAX_VPC_PREFIX).contains(&self.cidr.prefix()) {
            return Err(NetworkError::PrefixOutOfRange { cidr: self.cidr });
        }
        if self.max_azs == 0 {
            return Err(NetworkError::NoZones);
        }
        if self.subnet_groups.is_empty() {
            return Err(NetworkError::NoSubnetGroups);
        }

        let mut seen = Vec::with_capacity(self.subnet_groups.len());
        for group in &self.subnet_groups {
            if group.name.is_empty() || !group.name.chars().all(|ch| ch.is_ascii_alphanumeric()) {
                return Err(NetworkError::InvalidGroupName(group.name.clone()));
            }
            if seen.contains(&group.name.as_str()) {
                return Err(NetworkError::DuplicateGroupName(group.name.clone()));
            }
            seen.push(group.name.as_str());

            let min = self.cidr.prefix().saturating_add(1);
            if let Some(mask) = group.cidr_mask
                && !(min..=MAX_SUBNET_PREFIX).contains(&mask)
            {
                return Err(NetworkError::InvalidCidrMask {
                    group: group.name.clone(),
                    mask,
                    min,
                });
            }
        }

        let nat = self.nat_gateway_count();
        if nat > self.max_azs {
            return Err(NetworkError::TooManyNatGateways {
                requested: nat,
                zones: self.max_azs,
            });
        }
        if nat > 0 && !self.has(SubnetKind::Public) {
            return Err(NetworkError::NatWithoutPublicSubnets);
        }
        if nat == 0
            && let Some(group) = self
                .subnet_groups
                .iter()
                .find(|group| group.kind == SubnetKind::PrivateWithEgress)
        {
            return Err(NetworkError::EgressWithoutNat(group.name.clone()));
        }
        Ok(nat)
    }

    /// Carves one block per zone for every group: pinned masks first, then
    /// the rest share what is left equally.
    fn carve(&self) -> Result<BTreeMap<usize, Vec<Ipv4Cidr>>, NetworkError> {
        let mut allocator = SubnetAllocator::new(self.cidr);
        let mut blocks = BTreeMap::new();

        for (index, group) in self.subnet_groups.iter().enumerate() {
            if let Some(mask) = group.cidr_mask {
                let carved = (0..self.max_azs)
                    .map(|_| allocator.allocate(mask))
                    .collect::<Result<Vec<_>, _>>()?;
                blocks.insert(index, carved);
            }
        }

        let shared: Vec<usize> = self
            .subnet_groups
            .iter()
            .enumerate()
            .filter(|(_, group)| group.cidr_mask.is_none())
            .map(|(index, _)| index)
            .collect();
        if shared.is_empty() {
            return Ok(blocks);
        }

        let count = u64::try_from(shared.len())
            .unwrap_or(u64::MAX)
            .saturating_mul(u64::from(self.max_azs));
        let exhausted = || CidrError::Exhausted {
            range: self.cidr.to_string(),
            prefix: MAX_SUBNET_PREFIX,
        };
        let prefix = allocator
            .prefix_for_remaining(count)
            .filter(|prefix| *prefix <= MAX_SUBNET_PREFIX)
            .ok_or_else(exhausted)?;

        for index in shared {
            let carved = (0..self.max_azs)
                .map(|_| allocator.allocate(prefix))
                .collect::<Result<Vec<_>, _>>()?;
            blocks.insert(index, carved);
        }
        Ok(blocks)
    }
}

/// A declared subnet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subnet {
    name: String,
    group: String,
    kind: SubnetKind,
    zone_index: u8,
    cidr: Ipv4Cidr,
    logical_id: LogicalId,
    route_table: LogicalId,
    default_route: Option<LogicalId>,
    vpc: LogicalId,
}

impl Subnet {
    /// Subnet name such as `PublicSubnet1`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the group the subnet belongs to.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Routing behaviour.
    #[must_use]
    pub const fn kind(&self) -> SubnetKind {
        self.kind
    }

    /// Zero-based availability zone index.
    #[must_use]
    pub const fn zone_index(&self) -> u8 {
        self.zone_index
    }

    /// Address block carved for the subnet.
    #[must_use]
    pub const fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    /// Template key of the subnet resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.logical_id
    }

    /// Template key of the owning VPC.
    #[must_use]
    pub const fn vpc_logical_id(&self) -> &LogicalId {
        &self.vpc
    }

    /// Resolves to the subnet ID.
    #[must_use]
    pub fn subnet_id(&self) -> Token {
        self.logical_id.reference()
    }

    /// Resolves to the subnet's availability zone.
    #[must_use]
    pub const fn availability_zone(&self) -> Token {
        Token::AvailabilityZone(self.zone_index)
    }

    /// Resolves to the subnet's route table ID.
    #[must_use]
    pub fn route_table_id(&self) -> Token {
        self.route_table.reference()
    }

    /// Template key of the route to the outside world, if the subnet has
    /// one. Resources needing connectivity at launch depend on it.
    #[must_use]
    pub const fn default_route(&self) -> Option<&LogicalId> {
        self.default_route.as_ref()
    }
}

/// Handle to a declared network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Network {
    name: String,
    vpc: LogicalId,
    cidr: Ipv4Cidr,
    zones: u8,
    public_subnets: Vec<Subnet>,
    private_subnets: Vec<Subnet>,
    isolated_subnets: Vec<Subnet>,
    internet_gateway: Option<LogicalId>,
    nat_gateways: Vec<LogicalId>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct VpcProperties {
    cidr_block: Ipv4Cidr,
    enable_dns_hostnames: bool,
    enable_dns_support: bool,
    instance_tenancy: &'static str,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TaggedProperties {
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GatewayAttachmentProperties {
    internet_gateway_id: Token,
    vpc_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubnetProperties {
    availability_zone: Token,
    cidr_block: Ipv4Cidr,
    map_public_ip_on_launch: bool,
    tags: Vec<Tag>,
    vpc_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteTableProperties {
    tags: Vec<Tag>,
    vpc_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteTableAssociationProperties {
    route_table_id: Token,
    subnet_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RouteProperties {
    destination_cidr_block: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway_id: Option<Token>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nat_gateway_id: Option<Token>,
    route_table_id: Token,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct EipProperties {
    domain: &'static str,
    tags: Vec<Tag>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct NatGatewayProperties {
    allocation_id: Token,
    subnet_id: Token,
    tags: Vec<Tag>,
}

struct Gateways {
    internet: Option<(LogicalId, LogicalId)>,
    nat: Vec<LogicalId>,
}

impl Network {
    /// Declares the network and everything it needs to route traffic.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when the props are invalid, the range cannot
    /// hold the subnets, or registration with the stack fails.
    pub fn declare(
        stack: &mut Stack,
        id: &str,
        props: &NetworkProps,
    ) -> Result<Self, NetworkError> {
        let nat_count = props.validate()?;
        let mut blocks = props.carve()?;
        let root = ConstructPath::root(id)?;
        let network_path = stack.node_path(&root);

        let vpc = stack.add(
            &root.child("Resource")?,
            "AWS::EC2::VPC",
            &VpcProperties {
                cidr_block: props.cidr,
                enable_dns_hostnames: true,
                enable_dns_support: true,
                instance_tenancy: "default",
                tags: vec![Tag::name(network_path.clone())],
            },
            |resource| resource,
        )?;

        let mut gateways = Gateways {
            internet: None,
            nat: Vec::new(),
        };
        if props.has(SubnetKind::Public) {
            let igw_path = root.child("IGW")?;
            let igw = stack.add(
                &igw_path,
                "AWS::EC2::InternetGateway",
                &TaggedProperties {
                    tags: vec![Tag::name(network_path)],
                },
                |resource| resource,
            )?;
            let attachment = stack.add(
                &root.child("VPCGW")?,
                "AWS::EC2::VPCGatewayAttachment",
                &GatewayAttachmentProperties {
                    internet_gateway_id: igw.reference(),
                    vpc_id: vpc.reference(),
                },
                |resource| resource,
            )?;
            gateways.internet = Some((igw, attachment));
        }

        let mut network = Self {
            name: id.to_owned(),
            vpc,
            cidr: props.cidr,
            zones: props.max_azs,
            public_subnets: Vec::new(),
            private_subnets: Vec::new(),
            isolated_subnets: Vec::new(),
            internet_gateway: None,
            nat_gateways: Vec::new(),
        };

        for kind in [
            SubnetKind::Public,
            SubnetKind::PrivateWithEgress,
            SubnetKind::Isolated,
        ] {
            for (index, group) in props.subnet_groups.iter().enumerate() {
                if group.kind != kind {
                    continue;
                }
                let cidrs = blocks.remove(&index).unwrap_or_default();
                for (zone_index, cidr) in (0_u8..).zip(cidrs) {
                    let wants_nat = kind == SubnetKind::Public
                        && zone_index < nat_count
                        && gateways.nat.len() < usize::from(nat_count);
                    let subnet = network.declare_subnet(
                        stack,
                        &root,
                        group,
                        zone_index,
                        cidr,
                        &mut gateways,
                        wants_nat,
                    )?;
                    match kind {
                        SubnetKind::Public => network.public_subnets.push(subnet),
                        SubnetKind::PrivateWithEgress => network.private_subnets.push(subnet),
                        SubnetKind::Isolated => network.isolated_subnets.push(subnet),
                    }
                }
            }
        }

        network.internet_gateway = gateways.internet.map(|(igw, _)| igw);
        network.nat_gateways = gateways.nat;
        info!(
            network = id,
            cidr = %props.cidr,
            zones = props.max_azs,
            public = network.public_subnets.len(),
            private = network.private_subnets.len(),
            isolated = network.isolated_subnets.len(),
            nat_gateways = network.nat_gateways.len(),
            "declared network"
        );
        Ok(network)
    }

    #[expect(
        clippy::too_many_arguments,
        reason = "subnet expansion needs the group, zone, block and gateway state together"
    )]
    fn declare_subnet(
        &self,
        stack: &mut Stack,
        root: &ConstructPath,
        group: &SubnetGroup,
        zone_index: u8,
        cidr: Ipv4Cidr,
        gateways: &mut Gateways,
        wants_nat: bool,
    ) -> Result<Subnet, NetworkError> {
        let name = format!("{}Subnet{}", group.name, u16::from(zone_index) + 1);
        let node = root.child(&name)?;
        let node_path = stack.node_path(&node);
        let public = group.kind == SubnetKind::Public;

        let logical_id = stack.add(
            &node.child("Subnet")?,
            "AWS::EC2::Subnet",
            &SubnetProperties {
                availability_zone: Token::AvailabilityZone(zone_index),
                cidr_block: cidr,
                map_public_ip_on_launch: public,
                tags: vec![
                    Tag::name(node_path.clone()),
                    Tag::new(SUBNET_NAME_TAG, group.name.clone()),
                    Tag::new(SUBNET_TYPE_TAG, group.kind.label()),
                ],
                vpc_id: self.vpc.reference(),
            },
            |resource| resource,
        )?;
        let route_table = stack.add(
            &node.child("RouteTable")?,
            "AWS::EC2::RouteTable",
            &RouteTableProperties {
                tags: vec![Tag::name(node_path.clone())],
                vpc_id: self.vpc.reference(),
            },
            |resource| resource,
        )?;
        let association = stack.add(
            &node.child("RouteTableAssociation")?,
            "AWS::EC2::SubnetRouteTableAssociation",
            &RouteTableAssociationProperties {
                route_table_id: route_table.reference(),
                subnet_id: logical_id.reference(),
            },
            |resource| resource,
        )?;

        let default_route = match group.kind {
            SubnetKind::Public => match &gateways.internet {
                Some((igw, attachment)) => {
                    let route = stack.add(
                        &node.child("DefaultRoute")?,
                        "AWS::EC2::Route",
                        &RouteProperties {
                            destination_cidr_block: ANY_IPV4,
                            gateway_id: Some(igw.reference()),
                            nat_gateway_id: None,
                            route_table_id: route_table.reference(),
                        },
                        |resource| resource.depends_on(attachment.to_string()),
                    )?;
                    if wants_nat {
                        let nat = Self::declare_nat_gateway(
                            stack,
                            &node,
                            &node_path,
                            &logical_id,
                            &[route.clone(), association],
                        )?;
                        gateways.nat.push(nat);
                    }
                    Some(route)
                }
                None => None,
            },
            SubnetKind::PrivateWithEgress => {
                let nat = gateways
                    .nat
                    .iter()
                    .cycle()
                    .nth(usize::from(zone_index))
                    .ok_or_else(|| NetworkError::EgressWithoutNat(group.name.clone()))?;
                Some(stack.add(
                    &node.child("DefaultRoute")?,
                    "AWS::EC2::Route",
                    &RouteProperties {
                        destination_cidr_block: ANY_IPV4,
                        gateway_id: None,
                        nat_gateway_id: Some(nat.reference()),
                        route_table_id: route_table.reference(),
                    },
                    |resource| resource,
                )?)
            }
            SubnetKind::Isolated => None,
        };

        debug!(subnet = %name, cidr = %cidr, kind = group.kind.label(), "declared subnet");
        Ok(Subnet {
            name,
            group: group.name.clone(),
            kind: group.kind,
            zone_index,
            cidr,
            logical_id,
            route_table,
            default_route,
            vpc: self.vpc.clone(),
        })
    }

    fn declare_nat_gateway(
        stack: &mut Stack,
        node: &ConstructPath,
        node_path: &str,
        subnet: &LogicalId,
        after: &[LogicalId],
    ) -> Result<LogicalId, NetworkError> {
        let eip = stack.add(
            &node.child("EIP")?,
            "AWS::EC2::EIP",
            &EipProperties {
                domain: "vpc",
                tags: vec![Tag::name(node_path)],
            },
            |resource| resource,
        )?;
        let nat = stack.add(
            &node.child("NATGateway")?,
            "AWS::EC2::NatGateway",
            &NatGatewayProperties {
                allocation_id: eip.attribute("AllocationId"),
                subnet_id: subnet.reference(),
                tags: vec![Tag::name(node_path)],
            },
            |resource| {
                after
                    .iter()
                    .fold(resource, |acc, id| acc.depends_on(id.to_string()))
            },
        )?;
        Ok(nat)
    }

    /// Construct ID the network was declared under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template key of the VPC resource.
    #[must_use]
    pub const fn logical_id(&self) -> &LogicalId {
        &self.vpc
    }

    /// Resolves to the VPC ID.
    #[must_use]
    pub fn vpc_id(&self) -> Token {
        self.vpc.reference()
    }

    /// Address range of the network.
    #[must_use]
    pub const fn cidr(&self) -> Ipv4Cidr {
        self.cidr
    }

    /// Number of availability zones spanned.
    #[must_use]
    pub const fn zones(&self) -> u8 {
        self.zones
    }

    /// Public subnets, zone order within group order.
    #[must_use]
    pub fn public_subnets(&self) -> &[Subnet] {
        &self.public_subnets
    }

    /// Private-with-egress subnets.
    #[must_use]
    pub fn private_subnets(&self) -> &[Subnet] {
        &self.private_subnets
    }

    /// Isolated subnets.
    #[must_use]
    pub fn isolated_subnets(&self) -> &[Subnet] {
        &self.isolated_subnets
    }

    /// Every subnet of the network.
    pub fn subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.public_subnets
            .iter()
            .chain(&self.private_subnets)
            .chain(&self.isolated_subnets)
    }

    /// Template key of the internet gateway, when public groups exist.
    #[must_use]
    pub const fn internet_gateway(&self) -> Option<&LogicalId> {
        self.internet_gateway.as_ref()
    }

    /// Template keys of the NAT gateways.
    #[must_use]
    pub fn nat_gateways(&self) -> &[LogicalId] {
        &self.nat_gateways
    }

    /// Selects the first public subnet.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NoPublicSubnet`] when the network has none.
    pub fn first_public_subnet(&self) -> Result<&Subnet, NetworkError> {
        self.public_subnets
            .first()
            .ok_or_else(|| NetworkError::NoPublicSubnet(self.name.clone()))
    }

    /// Returns true when `subnet` was declared by this network.
    #[must_use]
    pub fn owns_subnet(&self, subnet: &Subnet) -> bool {
        subnet.vpc_logical_id() == self.logical_id()
            && self.subnets().any(|candidate| candidate == subnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn cidr(text: &str) -> Ipv4Cidr {
        text.parse()
            .unwrap_or_else(|err| panic!("fixture CIDR {text} should parse: {err}"))
    }

    #[fixture]
    fn stack() -> Stack {
        Stack::new("CdkStack").unwrap_or_else(|err| panic!("stack: {err}"))
    }

    fn declare(stack: &mut Stack, props: &NetworkProps) -> Network {
        Network::declare(stack, "MyVpc", props)
            .unwrap_or_else(|err| panic!("network should declare: {err}"))
    }

    fn count_of(stack: &Stack, type_name: &str) -> usize {
        stack
            .resources()
            .iter()
            .filter(|declared| declared.resource.type_name == type_name)
            .count()
    }

    #[rstest]
    fn default_layout_matches_reference_network(mut stack: Stack) {
        let network = declare(&mut stack, &NetworkProps::new(cidr("10.30.0.0/16"), 2));

        let public: Vec<String> = network
            .public_subnets()
            .iter()
            .map(|subnet| format!("{}={}", subnet.name(), subnet.cidr()))
            .collect();
        let private: Vec<String> = network
            .private_subnets()
            .iter()
            .map(|subnet| format!("{}={}", subnet.name(), subnet.cidr()))
            .collect();
        assert_eq!(
            public,
            ["PublicSubnet1=10.30.0.0/18", "PublicSubnet2=10.30.64.0/18"]
        );
        assert_eq!(
            private,
            ["PrivateSubnet1=10.30.128.0/18", "PrivateSubnet2=10.30.192.0/18"]
        );

        assert_eq!(count_of(&stack, "AWS::EC2::VPC"), 1);
        assert_eq!(count_of(&stack, "AWS::EC2::Subnet"), 4);
        assert_eq!(count_of(&stack, "AWS::EC2::RouteTable"), 4);
        assert_eq!(count_of(&stack, "AWS::EC2::SubnetRouteTableAssociation"), 4);
        assert_eq!(count_of(&stack, "AWS::EC2::Route"), 4);
        assert_eq!(count_of(&stack, "AWS::EC2::InternetGateway"), 1);
        assert_eq!(count_of(&stack, "AWS::EC2::VPCGatewayAttachment"), 1);
        assert_eq!(count_of(&stack, "AWS::EC2::EIP"), 2);
        assert_eq!(count_of(&stack, "AWS::EC2::NatGateway"), 2);
        assert_eq!(network.nat_gateways().len(), 2);
    }

    #[rstest]
    fn vpc_properties_carry_range_and_name_tag(mut stack: Stack) {
        let network = declare(&mut stack, &NetworkProps::new(cidr("10.30.0.0/16"), 2));
        let vpc = stack
            .resource(network.logical_id())
            .unwrap_or_else(|| panic!("vpc should be registered"));
        assert_eq!(
            vpc.property("CidrBlock"),
            Some(&serde_json::json!("10.30.0.0/16"))
        );
        assert_eq!(
            vpc.property("Tags"),
            Some(&serde_json::json!([{ "Key": "Name", "Value": "CdkStack/MyVpc" }]))
        );
    }

    #[rstest]
    fn private_routes_use_nat_gateway_in_same_zone(mut stack: Stack) {
        let network = declare(&mut stack, &NetworkProps::new(cidr("10.30.0.0/16"), 2));
        for (subnet, nat) in network.private_subnets().iter().zip(network.nat_gateways()) {
            let route = stack
                .resources()
                .iter()
                .find(|declared| {
                    declared.resource.type_name == "AWS::EC2::Route"
                        && declared.resource.property("RouteTableId")
                            == Some(&subnet.route_table_id().to_value())
                })
                .unwrap_or_else(|| panic!("route for {} should exist", subnet.name()));
            assert_eq!(
                route.resource.property("NatGatewayId"),
                Some(&nat.reference().to_value())
            );
            assert_eq!(subnet.default_route(), Some(&route.logical_id));
        }
    }

    #[rstest]
    fn public_subnets_record_their_internet_route(mut stack: Stack) {
        let network = declare(&mut stack, &NetworkProps::new(cidr("10.30.0.0/16"), 2));
        for subnet in network.public_subnets() {
            let route_id = subnet
                .default_route()
                .unwrap_or_else(|| panic!("{} should have a default route", subnet.name()));
            let route = stack
                .resource(route_id)
                .unwrap_or_else(|| panic!("route {route_id} should be registered"));
            assert_eq!(route.type_name, "AWS::EC2::Route");
            assert_eq!(
                route.property("RouteTableId"),
                Some(&subnet.route_table_id().to_value())
            );
            assert!(route.property("GatewayId").is_some());
        }
    }

    #[rstest]
    fn single_nat_gateway_is_shared(mut stack: Stack) {
        let props = NetworkProps {
            nat_gateways: Some(1),
            ..NetworkProps::new(cidr("10.30.0.0/16"), 3)
        };
        let network = declare(&mut stack, &props);
        assert_eq!(network.nat_gateways().len(), 1);
        assert_eq!(count_of(&stack, "AWS::EC2::Route"), 6);
    }

    #[rstest]
    fn isolated_only_network_has_no_gateways(mut stack: Stack) {
        let props = NetworkProps {
            subnet_groups: vec![SubnetGroup::new("Data", SubnetKind::Isolated)],
            ..NetworkProps::new(cidr("10.1.0.0/24"), 2)
        };
        let network = declare(&mut stack, &props);
        assert!(network.internet_gateway().is_none());
        assert!(network.nat_gateways().is_empty());
        assert_eq!(network.isolated_subnets().len(), 2);
        assert!(
            network
                .isolated_subnets()
                .iter()
                .all(|subnet| subnet.default_route().is_none())
        );
        assert!(matches!(
            network.first_public_subnet(),
            Err(NetworkError::NoPublicSubnet(ref name)) if name == "MyVpc"
        ));
    }

    #[rstest]
    fn pinned_masks_are_allocated_first(mut stack: Stack) {
        let props = NetworkProps {
            subnet_groups: vec![
                SubnetGroup::new("Public", SubnetKind::Public),
                SubnetGroup::new("Db", SubnetKind::Isolated).with_cidr_mask(24),
            ],
            ..NetworkProps::new(cidr("10.0.0.0/16"), 2)
        };
        let network = declare(&mut stack, &props);
        let isolated: Vec<String> = network
            .isolated_subnets()
            .iter()
            .map(|subnet| subnet.cidr().to_string())
            .collect();
        assert_eq!(isolated, ["10.0.0.0/24", "10.0.1.0/24"]);
        let public: Vec<String> = network
            .public_subnets()
            .iter()
            .map(|subnet| subnet.cidr().to_string())
            .collect();
        assert_eq!(public, ["10.0.64.0/18", "10.0.128.0/18"]);
        for subnet in network.public_subnets() {
            for pinned in network.isolated_subnets() {
                assert!(!subnet.cidr().overlaps(&pinned.cidr()));
            }
        }
    }

    #[rstest]
    #[case(NetworkProps::new(cidr("8.8.0.0/16"), 2), "not a private")]
    #[case(NetworkProps::new(cidr("10.0.0.0/8"), 2), "prefix between")]
    #[case(NetworkProps::new(cidr("10.0.0.0/16"), 0), "at least one availability zone")]
    #[case(
        NetworkProps { nat_gateways: Some(3), ..NetworkProps::new(cidr("10.0.0.0/16"), 2) },
        "3 NAT gateways"
    )]
    #[case(
        NetworkProps { nat_gateways: Some(0), ..NetworkProps::new(cidr("10.0.0.0/16"), 2) },
        "needs egress"
    )]
    #[case(
        NetworkProps {
            subnet_groups: vec![SubnetGroup::new("Private", SubnetKind::PrivateWithEgress)],
            ..NetworkProps::new(cidr("10.0.0.0/16"), 2)
        },
        "need a public subnet group"
    )]
    #[case(
        NetworkProps {
            subnet_groups: vec![
                SubnetGroup::new("A", SubnetKind::Public),
                SubnetGroup::new("A", SubnetKind::Isolated),
            ],
            ..NetworkProps::new(cidr("10.0.0.0/16"), 2)
        },
        "more than once"
    )]
    #[case(
        NetworkProps {
            subnet_groups: vec![SubnetGroup::new("Db", SubnetKind::Isolated).with_cidr_mask(12)],
            ..NetworkProps::new(cidr("10.0.0.0/16"), 2)
        },
        "mask /12"
    )]
    #[case(NetworkProps::new(cidr("10.0.0.0/28"), 2), "not enough address space")]
    fn rejects_invalid_props(mut stack: Stack, #[case] props: NetworkProps, #[case] snippet: &str) {
        let err = Network::declare(&mut stack, "MyVpc", &props).expect_err("props are invalid");
        assert!(
            err.to_string().contains(snippet),
            "expected `{snippet}` in `{err}`"
        );
    }

    #[rstest]
    fn owns_subnet_rejects_foreign_subnets(mut stack: Stack) {
        let first = declare(&mut stack, &NetworkProps::new(cidr("10.30.0.0/16"), 1));
        let second = Network::declare(
            &mut stack,
            "OtherVpc",
            &NetworkProps::new(cidr("10.31.0.0/16"), 1),
        )
        .unwrap_or_else(|err| panic!("second network: {err}"));
        let foreign = second
            .first_public_subnet()
            .unwrap_or_else(|err| panic!("public subnet: {err}"));
        assert!(!first.owns_subnet(foreign));
        assert!(second.owns_subnet(foreign));
    }
}
