//! Identifier derivation for admission checks.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};

/// An opaque key representing one logical caller.
///
/// The limiter itself treats identifiers as plain strings. These
/// constructors produce the canonical forms so that every call site buckets
/// the same caller the same way: `user:<id>` for authenticated principals
/// and `ip:<addr>` for anonymous traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Key for an authenticated principal.
    pub fn user(id: &str) -> Self {
        Self(format!("user:{}", id))
    }

    /// Key for a client network address.
    ///
    /// IPv6 addresses are grouped into their /64 prefix, since a single
    /// host typically controls the whole subnet and could otherwise rotate
    /// through it. IPv4-mapped IPv6 addresses collapse to the embedded
    /// IPv4 address.
    pub fn ip(addr: IpAddr) -> Self {
        Self(format!("ip:{}", ip_key(addr)))
    }

    /// Key derived from an `X-Forwarded-For` header value, using the first
    /// (client-most) hop.
    ///
    /// Only meaningful behind a proxy you control that overwrites the
    /// header. A directly exposed service lets clients forge it and should
    /// key on the peer address via [`Identifier::ip`] instead. Returns
    /// `None` when the value holds no parseable address.
    pub fn from_forwarded_for(value: &str) -> Option<Self> {
        let first = value.split(',').next()?.trim();
        first.parse::<IpAddr>().ok().map(Self::ip)
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identifier {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for Identifier {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn ip_key(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return v4.to_string();
            }
            let segments = v6.segments();
            let prefix = Ipv6Addr::new(
                segments[0],
                segments[1],
                segments[2],
                segments[3],
                0,
                0,
                0,
                0,
            );
            format!("{}/64", prefix)
        }
    }
}
