//! Server endpoint configuration and validation.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Dotted-quad IPv4 literal, octets 0-255 without leading zeros
static HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((0|1\d?\d?|2[0-4]?\d?|25[0-5]?|[3-9]\d?)\.){3}(0|1\d?\d?|2[0-4]?\d?|25[0-5]?|[3-9]\d?)$",
    )
    .expect("Invalid host regex pattern")
});

/// Lowest port a server may listen on.
pub const MIN_PORT: u32 = 1024;
/// Highest port a server may listen on.
pub const MAX_PORT: u32 = 65535;

/// True iff `host` is a dotted IPv4 literal.
pub fn validate_host(host: &str) -> bool {
    HOST_REGEX.is_match(host)
}

/// True iff `port` lies in `[1024, 65535]`.
pub fn validate_port(port: u32) -> bool {
    (MIN_PORT..=MAX_PORT).contains(&port)
}

/// Outcome of validating both endpoint fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointCheck {
    /// Both fields are valid.
    Valid,
    /// Only the host is invalid.
    InvalidHost,
    /// Only the port is invalid.
    InvalidPort,
    /// Neither field is valid.
    InvalidBoth,
}

impl EndpointCheck {
    /// True for [`EndpointCheck::Valid`].
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl fmt::Display for EndpointCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid endpoint"),
            Self::InvalidHost => write!(f, "invalid host"),
            Self::InvalidPort => write!(f, "invalid port"),
            Self::InvalidBoth => write!(f, "invalid host and port"),
        }
    }
}

/// Server host and port.
///
/// Fields may hold invalid values; they are only turned into an address
/// through [`Endpoint::socket_addr`], which validates first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    host: String,
    port: u32,
}

impl Endpoint {
    /// Creates an endpoint without validating it.
    pub fn new(host: impl Into<String>, port: u32) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host as last set.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port as last set.
    pub fn port(&self) -> u32 {
        self.port
    }

    /// Replaces the host.
    pub fn set_host(&mut self, host: impl Into<String>) {
        self.host = host.into();
    }

    /// Replaces the port.
    pub fn set_port(&mut self, port: u32) {
        self.port = port;
    }

    /// Validates both fields.
    pub fn check(&self) -> EndpointCheck {
        match (validate_host(&self.host), validate_port(self.port)) {
            (true, true) => EndpointCheck::Valid,
            (false, true) => EndpointCheck::InvalidHost,
            (true, false) => EndpointCheck::InvalidPort,
            (false, false) => EndpointCheck::InvalidBoth,
        }
    }

    /// Validated socket address.
    pub fn socket_addr(&self) -> ClientResult<SocketAddrV4> {
        let check = self.check();
        if !check.is_valid() {
            return Err(ClientError::Config(format!(
                "{check}: {:?}:{}",
                self.host, self.port
            )));
        }
        let ip: Ipv4Addr = self
            .host
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid host {:?}: {e}", self.host)))?;
        let port = u16::try_from(self.port)
            .map_err(|_| ClientError::Config(format!("invalid port {}", self.port)))?;
        Ok(SocketAddrV4::new(ip, port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_port_boundaries() {
        assert!(validate_port(1024));
        assert!(validate_port(65535));
        assert!(!validate_port(1023));
        assert!(!validate_port(65536));
        assert!(!validate_port(0));
    }

    #[test]
    fn test_host_boundaries() {
        assert!(validate_host("0.0.0.0"));
        assert!(validate_host("255.255.255.255"));
        assert!(validate_host("127.0.0.1"));
        assert!(validate_host("192.168.1.199"));
        assert!(!validate_host("256.0.0.1"));
        assert!(!validate_host("1.2.3"));
        assert!(!validate_host("1.2.3.4.5"));
        assert!(!validate_host("01.2.3.4"));
        assert!(!validate_host("localhost"));
        assert!(!validate_host(""));
        assert!(!validate_host(" 1.2.3.4"));
    }

    #[test]
    fn test_check_reports_each_field() {
        assert_eq!(Endpoint::new("127.0.0.1", 50000).check(), EndpointCheck::Valid);
        assert_eq!(Endpoint::new("1.2.3", 50000).check(), EndpointCheck::InvalidHost);
        assert_eq!(Endpoint::new("127.0.0.1", 80).check(), EndpointCheck::InvalidPort);
        assert_eq!(Endpoint::default().check(), EndpointCheck::InvalidBoth);
    }

    #[test]
    fn test_socket_addr() {
        let addr = Endpoint::new("127.0.0.1", 50000).socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:50000");

        let err = Endpoint::new("127.0.0.1", 1023).socket_addr().unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_setters() {
        let mut endpoint = Endpoint::default();
        endpoint.set_host("10.0.0.2");
        endpoint.set_port(4444);
        assert_eq!(endpoint.host(), "10.0.0.2");
        assert_eq!(endpoint.port(), 4444);
        assert_eq!(endpoint.to_string(), "10.0.0.2:4444");
    }

    proptest! {
        #[test]
        fn prop_every_ipv4_address_validates(a: u8, b: u8, c: u8, d: u8) {
            let host = Ipv4Addr::new(a, b, c, d).to_string();
            prop_assert!(validate_host(&host));
        }

        #[test]
        fn prop_out_of_range_octet_rejected(octet in 256u32..10_000, pos in 0usize..4) {
            let mut parts = vec!["1".to_string(); 4];
            parts[pos] = octet.to_string();
            prop_assert!(!validate_host(&parts.join(".")));
        }

        #[test]
        fn prop_port_range(port: u32) {
            prop_assert_eq!(validate_port(port), (1024..=65535).contains(&port));
        }
    }
}
