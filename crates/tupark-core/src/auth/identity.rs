use std::fmt;
use std::net::IpAddr;

use crate::error::TuparkError;

const MAX_IDENTITY_LEN: usize = 255;

/// The key login attempts are counted under: the client's network address.
///
/// Only constructible through [`Identity::parse`] or from an [`IpAddr`], so
/// the login guard never tracks an empty or degenerate key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Validate a raw source identity.
    pub fn parse(raw: &str) -> Result<Self, TuparkError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TuparkError::InvalidIdentity(
                "Source identity must not be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_IDENTITY_LEN {
            return Err(TuparkError::InvalidIdentity(format!(
                "Source identity exceeds {} bytes",
                MAX_IDENTITY_LEN
            )));
        }
        if trimmed.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(TuparkError::InvalidIdentity(
                "Source identity contains whitespace or control characters".to_string(),
            ));
        }
        Ok(Identity(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for Identity {
    fn from(ip: IpAddr) -> Self {
        // IPv4-mapped IPv6 addresses share a key with their IPv4 form.
        let ip = match ip {
            IpAddr::V6(v6) => v6
                .to_ipv4_mapped()
                .map(IpAddr::V4)
                .unwrap_or(IpAddr::V6(v6)),
            v4 => v4,
        };
        Identity(ip.to_string())
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims() {
        let id = Identity::parse("  1.2.3.4 ").unwrap();
        assert_eq!(id.as_str(), "1.2.3.4");
    }

    #[test]
    fn test_parse_rejects_degenerate_keys() {
        assert!(matches!(
            Identity::parse(""),
            Err(TuparkError::InvalidIdentity(_))
        ));
        assert!(Identity::parse("   ").is_err());
        assert!(Identity::parse("1.2.3.4 5.6.7.8").is_err());
        assert!(Identity::parse("1.2.3.4\n").is_ok());
        assert!(Identity::parse("bad\u{0}key").is_err());
        assert!(Identity::parse(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_ipv4_mapped_addresses_collapse() {
        let mapped: IpAddr = "::ffff:10.0.0.1".parse().unwrap();
        let plain: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(Identity::from(mapped), Identity::from(plain));
        assert_eq!(Identity::from(plain).as_str(), "10.0.0.1");
    }
}
