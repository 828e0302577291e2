use std::net::{AddrParseError, IpAddr, SocketAddr};

use ipnetwork::IpNetwork;

/// Placeholder logged for client addresses that cannot be truncated.
pub const UNKNOWN_ADDRESS: &str = "unknown-address";

/// Prefix length of truncated IPv4 client addresses.
const IPV4_PREFIX: u8 = 24;
/// Prefix length of truncated IPv6 client addresses.
const IPV6_PREFIX: u8 = 64;

/// The address of a client could not be determined.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    /// The `X-Forwarded-For` header is not a single IP address.
    #[error("unable to parse address from X-Forwarded-For={value}")]
    ForwardedFor {
        /// The raw header value.
        value: String,
        /// The parse failure.
        #[source]
        source: AddrParseError,
    },
    /// The remote address of the connection is not an `address:port` pair.
    #[error("unable to parse remote address {value:?}")]
    RemoteAddr {
        /// The raw remote address.
        value: String,
        /// The parse failure.
        #[source]
        source: AddrParseError,
    },
}

/// Determines the address of the client that submitted a request.
///
/// A non-empty `X-Forwarded-For` header takes precedence and must contain exactly one address.
/// Proxy chains with multiple comma-separated addresses are rejected. Without the header, the
/// address part of the connection's `address:port` is used.
pub fn resolve(
    forwarded_for: Option<&str>,
    remote_addr: &str,
) -> Result<IpAddr, AddressParseError> {
    if let Some(value) = forwarded_for.filter(|value| !value.is_empty()) {
        return value
            .parse()
            .map_err(|source| AddressParseError::ForwardedFor {
                value: value.to_owned(),
                source,
            });
    }

    remote_addr
        .parse::<SocketAddr>()
        .map(|addr| addr.ip())
        .map_err(|source| AddressParseError::RemoteAddr {
            value: remote_addr.to_owned(),
            source,
        })
}

/// Reduces a client address to its network.
///
/// IPv4 addresses are truncated to their `/24` network, IPv6 addresses to their `/64` network:
///
/// ```
/// use csp_server::extractors::truncate;
///
/// assert_eq!(truncate("203.0.113.7".parse().unwrap()), "203.0.113.0/24");
/// assert_eq!(truncate("2001:db8::1".parse().unwrap()), "2001:db8::/64");
/// ```
pub fn truncate(addr: IpAddr) -> String {
    let prefix = match addr {
        IpAddr::V4(_) => IPV4_PREFIX,
        IpAddr::V6(_) => IPV6_PREFIX,
    };

    match IpNetwork::new(addr, prefix).and_then(|net| IpNetwork::new(net.network(), prefix)) {
        Ok(network) => network.to_string(),
        Err(_) => UNKNOWN_ADDRESS.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_forwarded_for() {
        let addr = resolve(Some("203.0.113.7"), "10.0.0.1:4321").unwrap();
        assert_eq!(addr, "203.0.113.7".parse::<IpAddr>().unwrap());

        let addr = resolve(Some("2001:db8::1"), "").unwrap();
        assert_eq!(addr, "2001:db8::1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_resolve_empty_header_falls_back() {
        let addr = resolve(Some(""), "10.0.0.1:4321").unwrap();
        assert_eq!(addr, "10.0.0.1".parse::<IpAddr>().unwrap());

        let addr = resolve(None, "[2001:db8::2]:443").unwrap();
        assert_eq!(addr, "2001:db8::2".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_resolve_chain_is_rejected() {
        let error = resolve(Some("203.0.113.7, 10.0.0.1"), "10.0.0.1:4321").unwrap_err();
        assert!(matches!(error, AddressParseError::ForwardedFor { .. }));
        assert_eq!(
            error.to_string(),
            "unable to parse address from X-Forwarded-For=203.0.113.7, 10.0.0.1"
        );
    }

    #[test]
    fn test_resolve_invalid_remote_addr() {
        for remote_addr in ["", "10.0.0.1", "not an address:80"] {
            let error = resolve(None, remote_addr).unwrap_err();
            assert!(matches!(error, AddressParseError::RemoteAddr { .. }));
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("203.0.113.7".parse().unwrap()), "203.0.113.0/24");
        assert_eq!(truncate("10.1.2.255".parse().unwrap()), "10.1.2.0/24");
        assert_eq!(truncate("2001:db8::1".parse().unwrap()), "2001:db8::/64");
        assert_eq!(
            truncate("2001:db8:1:2:3:4:5:6".parse().unwrap()),
            "2001:db8:1:2::/64"
        );
    }
}
