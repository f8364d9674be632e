//! IPv4 CIDR ranges and subnet carving.
//!
//! Network declarations describe their address space as an [`Ipv4Cidr`]. The
//! [`SubnetAllocator`] hands out aligned, non-overlapping blocks from that
//! space in declaration order.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Smallest subnet prefix accepted by the provider (`/28`, 16 addresses).
pub const MAX_SUBNET_PREFIX: u8 = 28;

const PRIVATE_RANGES: [Ipv4Cidr; 3] = [
    Ipv4Cidr::from_parts_unchecked(Ipv4Addr::new(10, 0, 0, 0), 8),
    Ipv4Cidr::from_parts_unchecked(Ipv4Addr::new(172, 16, 0, 0), 12),
    Ipv4Cidr::from_parts_unchecked(Ipv4Addr::new(192, 168, 0, 0), 16),
];

/// Errors raised while parsing or carving CIDR ranges.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CidrError {
    /// Raised when the text is not `address/prefix`.
    #[error("invalid CIDR block `{0}`: expected a.b.c.d/nn")]
    Malformed(String),
    /// Raised when the prefix length is above 32.
    #[error("invalid CIDR block `{block}`: prefix length {prefix} exceeds 32")]
    PrefixOutOfRange {
        /// Input text.
        block: String,
        /// Parsed prefix length.
        prefix: u8,
    },
    /// Raised when the address has bits set below the prefix.
    #[error("invalid CIDR block `{block}`: host bits are set (did you mean {canonical}?)")]
    HostBitsSet {
        /// Input text.
        block: String,
        /// The block with host bits cleared.
        canonical: String,
    },
    /// Raised when the range cannot fit another block of the requested size.
    #[error("not enough address space in {range} for a /{prefix} subnet")]
    Exhausted {
        /// Range being carved.
        range: String,
        /// Requested prefix length.
        prefix: u8,
    },
}

/// An IPv4 network range in CIDR notation with no host bits set.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Builds a range from its parts, clearing any host bits.
    ///
    /// # Errors
    ///
    /// Returns [`CidrError::PrefixOutOfRange`] when `prefix` exceeds 32.
    pub fn new(address: Ipv4Addr, prefix: u8) -> Result<Self, CidrError> {
        if prefix > 32 {
            return Err(CidrError::PrefixOutOfRange {
                block: format!("{address}/{prefix}"),
                prefix,
            });
        }
        let masked = u32::from(address) & mask(prefix);
        Ok(Self {
            network: Ipv4Addr::from(masked),
            prefix,
        })
    }

    pub(crate) const fn from_parts_unchecked(network: Ipv4Addr, prefix: u8) -> Self {
        Self { network, prefix }
    }

    /// First address of the range.
    #[must_use]
    pub const fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length in bits.
    #[must_use]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Number of addresses covered by the range.
    #[must_use]
    pub const fn size(&self) -> u64 {
        1_u64 << (32 - self.prefix)
    }

    fn start(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    fn end(&self) -> u64 {
        self.start() + self.size()
    }

    /// Returns true when `other` lies entirely inside this range.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.prefix >= self.prefix && other.start() >= self.start() && other.end() <= self.end()
    }

    /// Returns true when the two ranges share at least one address.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Returns true when the range lies inside one of the RFC 1918 blocks.
    #[must_use]
    pub fn is_private(&self) -> bool {
        PRIVATE_RANGES.iter().any(|range| range.contains(self))
    }
}

const fn mask(prefix: u8) -> u32 {
    match u32::MAX.checked_shl(32 - prefix as u32) {
        Some(value) => value,
        None => 0,
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = CidrError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let text = value.trim();
        let (address_text, prefix_text) = text
            .split_once('/')
            .ok_or_else(|| CidrError::Malformed(text.to_owned()))?;
        let address = address_text
            .parse::<Ipv4Addr>()
            .map_err(|_| CidrError::Malformed(text.to_owned()))?;
        let prefix = prefix_text
            .parse::<u8>()
            .map_err(|_| CidrError::Malformed(text.to_owned()))?;

        let cidr = Self::new(address, prefix).map_err(|_| CidrError::PrefixOutOfRange {
            block: text.to_owned(),
            prefix,
        })?;
        if cidr.network != address {
            return Err(CidrError::HostBitsSet {
                block: text.to_owned(),
                canonical: cidr.to_string(),
            });
        }
        Ok(cidr)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Carves aligned subnets out of a parent range, lowest addresses first.
#[derive(Clone, Debug)]
pub struct SubnetAllocator {
    range: Ipv4Cidr,
    next: u64,
}

impl SubnetAllocator {
    /// Starts allocating at the bottom of `range`.
    #[must_use]
    pub fn new(range: Ipv4Cidr) -> Self {
        Self {
            next: range.start(),
            range,
        }
    }

    /// Addresses not yet handed out.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.range.end().saturating_sub(self.next)
    }

    /// Returns the largest prefix length at which `count` equal subnets still
    /// fit in the remaining space, or `None` when even `/32` does not fit.
    #[must_use]
    pub fn prefix_for_remaining(&self, count: u64) -> Option<u8> {
        if count == 0 {
            return None;
        }
        let per_subnet = self.remaining().checked_div(count)?;
        if per_subnet == 0 {
            return None;
        }
        let bits = per_subnet.ilog2();
        u8::try_from(32_u32.saturating_sub(bits)).ok()
    }

    /// Allocates the next aligned block of the given prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`CidrError::Exhausted`] when the block would not fit inside
    /// the parent range, or when `prefix` is shorter than the parent's.
    pub fn allocate(&mut self, prefix: u8) -> Result<Ipv4Cidr, CidrError> {
        let exhausted = || CidrError::Exhausted {
            range: self.range.to_string(),
            prefix,
        };
        if prefix < self.range.prefix || prefix > 32 {
            return Err(exhausted());
        }
        let block = 1_u64 << (32 - prefix);
        let start = self.next.next_multiple_of(block);
        let end = start + block;
        if end > self.range.end() {
            return Err(exhausted());
        }
        let address = u32::try_from(start).map_err(|_| exhausted())?;
        self.next = end;
        Ok(Ipv4Cidr::from_parts_unchecked(Ipv4Addr::from(address), prefix))
    }
}
