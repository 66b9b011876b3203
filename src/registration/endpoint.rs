use crate::config::ServerConfig;
use crate::error::RegistrationError;
use std::fmt;
use std::net::Ipv6Addr;
use url::{Host, Url};

pub const DEFAULT_PORT: u16 = 8001;
pub const NOTIFICATION_PATH: &str = "/scanner";

/// Server address as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u64,
}

impl Endpoint {
    pub fn new<S: Into<String>>(host: S, port: u64) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// A missing or unparsable port falls back to 8001
    pub fn from_user_input(host: &str, port: Option<&str>) -> Self {
        let port = port
            .and_then(|p| p.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_PORT as u64);
        Self::new(host, port)
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::from_user_input(&config.host, config.port.as_deref())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u64 {
        self.port
    }

    /// Validate into a connectable `http://host:port/scanner` target.
    ///
    /// An empty host is accepted here and fails at connect time.
    pub fn resolve(&self) -> Result<RequestTarget, RegistrationError> {
        let port = u16::try_from(self.port).map_err(|_| RegistrationError::MalformedEndpoint {
            details: format!("port {} is out of range", self.port),
        })?;

        if self.host.is_empty() {
            return Ok(RequestTarget {
                host: String::new(),
                port,
            });
        }

        let malformed = |reason: String| RegistrationError::MalformedEndpoint {
            details: format!("host {:?}: {}", self.host, reason),
        };

        // Bare IPv6 literals are accepted without brackets
        let host = if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let host = Host::parse(&host).map_err(|e| malformed(e.to_string()))?;

        let url = Url::parse(&format!("http://{}:{}{}", host, port, NOTIFICATION_PATH))
            .map_err(|e| malformed(e.to_string()))?;
        if url.path() != NOTIFICATION_PATH || url.port_or_known_default() != Some(port) {
            return Err(malformed(format!("does not form a valid URL ({})", url)));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(malformed("has no host part".to_string())),
        };

        Ok(RequestTarget { host, port })
    }
}

/// Validated destination of a notification request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    host: String,
    port: u16,
}

impl RequestTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &'static str {
        NOTIFICATION_PATH
    }

    /// Value of the `Host` header
    pub fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.authority(), self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_fallback() {
        assert_eq!(Endpoint::from_user_input("h", None).port(), 8001);
        assert_eq!(Endpoint::from_user_input("h", Some("abc")).port(), 8001);
        assert_eq!(Endpoint::from_user_input("h", Some("-1")).port(), 8001);
        assert_eq!(Endpoint::from_user_input("h", Some("")).port(), 8001);
        assert_eq!(Endpoint::from_user_input("h", Some("9000")).port(), 9000);
        assert_eq!(Endpoint::from_user_input("h", Some(" 9000 ")).port(), 9000);
    }

    #[test]
    fn test_resolve_url() {
        let target = Endpoint::new("192.168.1.20", 8001).resolve().unwrap();
        assert_eq!(target.to_string(), "http://192.168.1.20:8001/scanner");
        assert_eq!(target.authority(), "192.168.1.20:8001");

        let target = Endpoint::new("scanner.local", 80).resolve().unwrap();
        assert_eq!(target.to_string(), "http://scanner.local:80/scanner");
    }

    #[test]
    fn test_resolve_ipv6() {
        let target = Endpoint::new("[::1]", 8001).resolve().unwrap();
        assert_eq!(target.host(), "::1");
        assert_eq!(target.to_string(), "http://[::1]:8001/scanner");

        let target = Endpoint::new("::1", 8001).resolve().unwrap();
        assert_eq!(target.authority(), "[::1]:8001");
    }

    #[test]
    fn test_resolve_normalizes_domain_case() {
        let target = Endpoint::new("Scanner.Local", 8001).resolve().unwrap();
        assert_eq!(target.host(), "scanner.local");
    }

    #[test]
    fn test_empty_host_is_not_malformed() {
        let target = Endpoint::from_user_input("", Some("x")).resolve().unwrap();
        assert_eq!(target.host(), "");
        assert_eq!(target.port(), 8001);
    }

    #[test]
    fn test_malformed_endpoints() {
        for host in [
            "bad host", "a/b", "a?b", "a#b", "user@host", "[zz]", "a:b", "a\nb", "a%20b",
        ] {
            let result = Endpoint::new(host, 8001).resolve();
            assert!(
                matches!(result, Err(RegistrationError::MalformedEndpoint { .. })),
                "host {:?} should be malformed",
                host
            );
        }

        let result = Endpoint::new("localhost", 70000).resolve();
        assert!(matches!(
            result,
            Err(RegistrationError::MalformedEndpoint { .. })
        ));
    }
}
