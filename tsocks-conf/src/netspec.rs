//! Destination network specifications: `ADDRESS[:PORT[-PORT]]/MASK`

use crate::error::NetSpecError;
use ipnet::Ipv4Net;
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Inclusive destination port range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Create a range; `None` if `start` is zero or after `end`
    pub fn new(start: u16, end: u16) -> Option<Self> {
        (start != 0 && start <= end).then_some(Self { start, end })
    }

    /// Range covering exactly one port
    pub fn single(port: u16) -> Option<Self> {
        Self::new(port, port)
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A destination network, optionally restricted to a port range.
///
/// The address is always the base of its own network (`address & mask ==
/// address`). Masks are taken as written and need not be contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    address: Ipv4Addr,
    mask: Ipv4Addr,
    ports: Option<PortRange>,
}

impl NetworkSpec {
    /// Build a spec from parts, rejecting an address with bits outside the mask
    pub fn new(
        address: Ipv4Addr,
        mask: Ipv4Addr,
        ports: Option<PortRange>,
    ) -> Result<Self, NetSpecError> {
        check_network_base(address, mask)?;
        Ok(Self {
            address,
            mask,
            ports,
        })
    }

    /// `127.0.0.0/255.0.0.0`, always treated as local
    pub fn loopback() -> Self {
        Self {
            address: Ipv4Addr::new(127, 0, 0, 0),
            mask: Ipv4Addr::new(255, 0, 0, 0),
            ports: None,
        }
    }

    /// `0.0.0.0/0.0.0.0`, matching every address
    pub fn everything() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            mask: Ipv4Addr::UNSPECIFIED,
            ports: None,
        }
    }

    /// Build an address-only spec from CIDR notation
    pub fn from_ipnet(net: Ipv4Net) -> Self {
        Self {
            address: net.network(),
            mask: net.netmask(),
            ports: None,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn mask(&self) -> Ipv4Addr {
        self.mask
    }

    pub fn ports(&self) -> Option<PortRange> {
        self.ports
    }

    /// CIDR view of the network, when the mask is contiguous
    pub fn to_ipnet(&self) -> Option<Ipv4Net> {
        let prefix = ipnet::ipv4_mask_to_prefix(self.mask).ok()?;
        Ipv4Net::new(self.address, prefix).ok()
    }

    /// Check whether `dest` lies in this network
    pub fn contains_addr(&self, dest: Ipv4Addr) -> bool {
        let mask = u32::from(self.mask);
        u32::from(dest) & mask == u32::from(self.address) & mask
    }

    /// Check a port against the range; no range matches any port
    pub fn contains_port(&self, port: u16) -> bool {
        self.ports.map_or(true, |range| range.contains(port))
    }

    /// Address and port both match
    pub fn matches(&self, dest: Ipv4Addr, port: u16) -> bool {
        self.contains_addr(dest) && self.contains_port(port)
    }
}

/// Split `text` at the first character in `separators`, returning the head,
/// the separator found, and the remainder.
fn split_at_any<'a>(text: &'a str, separators: &[char]) -> (&'a str, Option<char>, Option<&'a str>) {
    match text.find(separators) {
        Some(idx) => {
            let sep = text[idx..].chars().next();
            (&text[..idx], sep, Some(&text[idx + 1..]))
        }
        None => (text, None, None),
    }
}

fn check_network_base(address: Ipv4Addr, mask: Ipv4Addr) -> Result<(), NetSpecError> {
    if u32::from(address) & u32::from(mask) != u32::from(address) {
        return Err(NetSpecError::NotNetworkBase { address, mask });
    }
    Ok(())
}

fn parse_port(text: &str) -> Option<u16> {
    text.parse::<u16>().ok().filter(|port| *port != 0)
}

impl FromStr for NetworkSpec {
    type Err = NetSpecError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (ip, mut sep, mut rest) = split_at_any(value, &['/', ':']);

        let mut start_port = None;
        let mut end_port = None;
        if sep == Some(':') {
            let (start, next_sep, next_rest) = split_at_any(rest.unwrap_or(""), &['-', '/']);
            start_port = Some(start);
            sep = next_sep;
            rest = next_rest;
            if sep == Some('-') {
                let (end, next_sep, next_rest) = split_at_any(rest.unwrap_or(""), &['/']);
                end_port = Some(end);
                sep = next_sep;
                rest = next_rest;
            }
        }

        // Only a '/' introduces the mask; anything else leaves it missing
        let subnet = match (sep, rest) {
            (Some('/'), Some(rest)) => rest.split([' ', '\n']).next(),
            _ => None,
        };
        let subnet = subnet.ok_or(NetSpecError::Malformed)?;

        let address: Ipv4Addr = ip
            .parse()
            .map_err(|_| NetSpecError::InvalidAddress(ip.to_string()))?;
        let mask: Ipv4Addr = subnet
            .parse()
            .map_err(|_| NetSpecError::InvalidMask(subnet.to_string()))?;
        // Must precede the port checks
        check_network_base(address, mask)?;

        let start = start_port
            .map(|text| parse_port(text).ok_or_else(|| NetSpecError::InvalidStartPort(text.to_string())))
            .transpose()?;
        let end = end_port
            .map(|text| parse_port(text).ok_or_else(|| NetSpecError::InvalidEndPort(text.to_string())))
            .transpose()?;

        let ports = match (start, end) {
            (Some(start), Some(end)) => {
                if start > end {
                    return Err(NetSpecError::EndBeforeStart { start, end });
                }
                PortRange::new(start, end)
            }
            (Some(start), None) => PortRange::single(start),
            // An end port is only reachable through a start port
            (None, _) => None,
        };

        Self::new(address, mask, ports)
    }
}

impl fmt::Display for NetworkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)?;
        if let Some(ports) = self.ports {
            write!(f, ":{}", ports)?;
        }
        write!(f, "/{}", self.mask)
    }
}

impl Serialize for NetworkSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
