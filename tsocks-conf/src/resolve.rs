//! Server address resolution

use crate::config::schema::ServerProfile;
use crate::error::ResolveError;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs};

/// Turns a configured server name into an IPv4 address
pub trait HostResolver: Send + Sync {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr, ResolveError>;
}

/// Resolver backed by the system's name lookup
#[derive(Debug, Clone, Copy)]
pub struct SystemResolver {
    allow_names: bool,
}

impl SystemResolver {
    /// `allow_names = false` accepts numeric addresses only
    pub fn new(allow_names: bool) -> Self {
        Self { allow_names }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl HostResolver for SystemResolver {
    fn resolve(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(ip);
        }
        if !self.allow_names {
            return Err(ResolveError::NotNumeric(host.to_string()));
        }

        let addrs = (host, 0).to_socket_addrs().map_err(|source| ResolveError::Lookup {
            host: host.to_string(),
            source,
        })?;
        addrs
            .filter_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
            .next()
            .ok_or_else(|| ResolveError::NoIpv4(host.to_string()))
    }
}

impl ServerProfile {
    /// Resolve this server's address and pair it with its port
    pub fn socket_addr(&self, resolver: &dyn HostResolver) -> Result<SocketAddrV4, ResolveError> {
        let host = self.address.as_deref().ok_or(ResolveError::NoAddress)?;
        let ip = resolver.resolve(host)?;
        Ok(SocketAddrV4::new(ip, self.port()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticResolver(HashMap<&'static str, Ipv4Addr>);

    impl HostResolver for StaticResolver {
        fn resolve(&self, host: &str) -> Result<Ipv4Addr, ResolveError> {
            self.0
                .get(host)
                .copied()
                .ok_or_else(|| ResolveError::NoIpv4(host.to_string()))
        }
    }

    #[test]
    fn test_numeric_address() {
        let resolver = SystemResolver::new(false);
        assert_eq!(resolver.resolve("10.1.2.3").unwrap(), Ipv4Addr::new(10, 1, 2, 3));
    }

    #[test]
    fn test_names_disabled() {
        let resolver = SystemResolver::new(false);
        assert!(matches!(
            resolver.resolve("proxy.example.net"),
            Err(ResolveError::NotNumeric(_))
        ));
    }

    #[test]
    fn test_socket_addr() {
        let resolver = StaticResolver(HashMap::from([("proxy", Ipv4Addr::new(10, 0, 0, 1))]));
        let mut profile = ServerProfile {
            address: Some("proxy".to_string()),
            ..Default::default()
        };
        profile.apply_defaults();

        assert_eq!(
            profile.socket_addr(&resolver).unwrap(),
            SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 1080)
        );
    }

    #[test]
    fn test_socket_addr_without_address() {
        let profile = ServerProfile::default();
        assert!(matches!(
            profile.socket_addr(&SystemResolver::default()),
            Err(ResolveError::NoAddress)
        ));
    }
}
