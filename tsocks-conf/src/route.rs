//! Route selection over a loaded configuration

use crate::config::schema::{ProxyConfig, ServerProfile};
use std::fmt;
use std::net::Ipv4Addr;
use tracing::debug;

/// How a connection to a destination should be made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    /// Connect directly, bypassing every proxy
    Direct,
    /// Connect through this server
    Proxy(&'a ServerProfile),
}

impl fmt::Display for RouteDecision<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::Direct => write!(f, "direct"),
            RouteDecision::Proxy(server) => write!(f, "via {}", server),
        }
    }
}

impl ProxyConfig {
    /// Check whether a connection must go through a proxy.
    ///
    /// A path reach rule matching the destination and port means yes; a
    /// local network containing the destination means no. Anything else is
    /// proxied.
    pub fn requires_proxy(&self, dest: Ipv4Addr, port: u16) -> bool {
        let reachable = self
            .paths
            .iter()
            .flat_map(|path| path.reaches.iter())
            .any(|net| net.matches(dest, port));
        if reachable {
            return true;
        }

        !self.local_nets.iter().any(|net| net.contains_addr(dest))
    }

    /// Pick the server that carries a connection.
    ///
    /// The first path with a reach rule covering the destination and port
    /// wins; otherwise the default server is used.
    pub fn pick_server(&self, dest: Ipv4Addr, port: u16) -> &ServerProfile {
        debug!("Picking appropriate server for {}:{}", dest, port);
        for path in &self.paths {
            debug!(
                "Checking SOCKS server {}",
                path.address.as_deref().unwrap_or("(No Address)")
            );
            if let Some(net) = path.reaches.iter().find(|net| net.matches(dest, port)) {
                debug!("Server can reach {} via {}", dest, net);
                return path;
            }
        }

        &self.default_server
    }

    /// Decide how to reach a destination: direct, or through a server
    pub fn route(&self, dest: Ipv4Addr, port: u16) -> RouteDecision<'_> {
        if self.requires_proxy(dest, port) {
            RouteDecision::Proxy(self.pick_server(dest, port))
        } else {
            RouteDecision::Direct
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::parser::ConfigParser;

    fn load(contents: &str) -> ProxyConfig {
        let outcome = ConfigParser::new(&CollectingSink::new()).parse_str(contents);
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        outcome.config
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    const EXAMPLE: &str = "\
server = 1.2.3.4
local = 192.168.0.0/255.255.0.0
path {
    server = 5.6.7.8
    server_port = 1081
    reaches = 192.168.0.0:80/255.255.0.0
}
";

    #[test]
    fn test_path_rule_selects_path_server() {
        let config = load(EXAMPLE);
        assert!(config.requires_proxy(ip("192.168.0.5"), 80));

        let server = config.pick_server(ip("192.168.0.5"), 80);
        assert_eq!(server.address.as_deref(), Some("5.6.7.8"));
        assert_eq!(server.port(), 1081);
    }

    #[test]
    fn test_local_network_bypasses_proxy() {
        let config = load(EXAMPLE);
        assert!(!config.requires_proxy(ip("192.168.0.5"), 443));
        assert_eq!(config.route(ip("192.168.0.5"), 443), RouteDecision::Direct);
        assert_eq!(config.route(ip("127.0.0.1"), 80), RouteDecision::Direct);
    }

    #[test]
    fn test_unknown_destination_uses_default_server() {
        let config = load(EXAMPLE);
        assert!(config.requires_proxy(ip("9.9.9.9"), 80));

        let server = config.pick_server(ip("9.9.9.9"), 80);
        assert_eq!(server.address.as_deref(), Some("1.2.3.4"));
        assert_eq!(server.port(), 1080);
        assert_eq!(config.route(ip("9.9.9.9"), 80), RouteDecision::Proxy(&config.default_server));
    }

    #[test]
    fn test_later_path_wins() {
        let config = load(
            "server = 1.1.1.1\n\
             path {\n server = first\n reaches = 10.0.0.0/255.0.0.0\n}\n\
             path {\n server = second\n reaches = 10.0.0.0/255.255.0.0\n}\n",
        );
        let server = config.pick_server(ip("10.0.1.1"), 22);
        assert_eq!(server.address.as_deref(), Some("second"));

        // Only the earlier path covers this address
        let server = config.pick_server(ip("10.1.1.1"), 22);
        assert_eq!(server.address.as_deref(), Some("first"));
    }

    #[test]
    fn test_later_reach_rule_checked_first() {
        let config = load(
            "path {\n server = p\n\
             reaches = 10.0.0.0:1-100/255.0.0.0\n\
             reaches = 10.0.0.0:50-60/255.0.0.0\n}\n",
        );
        let path = &config.paths[0];
        assert_eq!(path.reaches[0].to_string(), "10.0.0.0:50-60/255.0.0.0");
        assert!(config.requires_proxy(ip("10.2.3.4"), 55));
        assert!(config.requires_proxy(ip("10.2.3.4"), 99));
    }

    #[test]
    fn test_path_rule_overrides_local() {
        let config = load(
            "local = 10.0.0.0/255.0.0.0\n\
             path {\n server = p\n reaches = 10.0.0.0:22/255.0.0.0\n}\n",
        );
        assert_eq!(
            config.route(ip("10.0.0.9"), 22),
            RouteDecision::Proxy(&config.paths[0])
        );
        assert_eq!(config.route(ip("10.0.0.9"), 80), RouteDecision::Direct);
    }

    #[test]
    fn test_selection_never_fails() {
        let config = load("");
        assert_eq!(config.pick_server(ip("8.8.8.8"), 53), &config.default_server);
        assert!(config.default_server.address.is_none());
    }
}
