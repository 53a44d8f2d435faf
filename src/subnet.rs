//! CIDR network ranges and address containment.

use crate::error::ConfigError;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A blocked network: base address plus prefix length.
///
/// The prefix length is kept as written. A length wider than the address
/// family (e.g. `/33` on IPv4) is accepted at parse time but never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkRange {
    base: IpAddr,
    prefix_len: u8,
}

impl NetworkRange {
    pub fn new(base: IpAddr, prefix_len: u8) -> Self {
        Self { base, prefix_len }
    }

    pub fn base(&self) -> IpAddr {
        self.base
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Width of the base address in bits (32 or 128).
    pub fn max_prefix_len(&self) -> u8 {
        max_prefix_len(&self.base)
    }

    /// Whether this range can ever match anything.
    pub fn is_well_formed(&self) -> bool {
        self.prefix_len <= self.max_prefix_len()
    }

    /// Check if an address falls inside this range.
    pub fn contains(&self, addr: &IpAddr) -> bool {
        in_subnet(addr, &self.base, self.prefix_len)
    }
}

impl fmt::Display for NetworkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

impl FromStr for NetworkRange {
    type Err = ConfigError;

    /// Parse `a.b.c.d/n` or `ipv6::/n`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| ConfigError::cidr(s, "missing '/' prefix length"))?;

        if prefix.contains('/') {
            return Err(ConfigError::cidr(s, "more than one '/'"));
        }

        let base: IpAddr = addr
            .trim()
            .parse()
            .map_err(|e| ConfigError::cidr(s, format!("bad address: {}", e)))?;

        let prefix = prefix.trim();
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::cidr(s, "prefix length is not a non-negative integer"));
        }
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|_| ConfigError::cidr(s, "prefix length out of range"))?;

        Ok(Self::new(base, prefix_len))
    }
}

fn max_prefix_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Check whether `addr` lies in the network `base/prefix_len`.
///
/// Addresses of a different family than `base` never match, and neither does
/// any prefix wider than the family allows.
pub fn in_subnet(addr: &IpAddr, base: &IpAddr, prefix_len: u8) -> bool {
    match (addr, base) {
        (IpAddr::V4(addr), IpAddr::V4(base)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            (u32::from(*addr) & mask) == (u32::from(*base) & mask)
        }
        (IpAddr::V6(addr), IpAddr::V6(base)) => {
            if prefix_len > 128 {
                return false;
            }
            let addr = addr.octets();
            let base = base.octets();

            let full_bytes = (prefix_len / 8) as usize;
            let remaining_bits = prefix_len % 8;

            if addr[..full_bytes] != base[..full_bytes] {
                return false;
            }

            if remaining_bits > 0 {
                let mask = 0xFFu8 << (8 - remaining_bits);
                if addr[full_bytes] & mask != base[full_bytes] & mask {
                    return false;
                }
            }

            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> NetworkRange {
        s.parse().unwrap()
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_ipv4_range() {
        let r = range("38.100.21.0/24");
        assert_eq!(r.base(), ip("38.100.21.0"));
        assert_eq!(r.prefix_len(), 24);
        assert_eq!(r.to_string(), "38.100.21.0/24");
    }

    #[test]
    fn test_parse_ipv6_range() {
        let r = range("2001:db8::/32");
        assert_eq!(r.base(), ip("2001:db8::"));
        assert_eq!(r.prefix_len(), 32);
        assert_eq!(r.max_prefix_len(), 128);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "38.100.21.0",
            "38.100.21.0/",
            "38.100.21.0/abc",
            "38.100.21.0/-1",
            "38.100.21.0/+8",
            "38.100.21.0/24/8",
            "38.100.21/24",
            "not-an-ip/8",
            "/24",
            "10.0.0.0/256",
        ] {
            let err = bad.parse::<NetworkRange>().unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidCidr { .. }),
                "{} should be rejected, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_parse_keeps_oversized_prefix() {
        let r = range("10.0.0.0/33");
        assert!(!r.is_well_formed());
        assert!(!r.contains(&ip("10.0.0.0")));

        let r = range("::/129");
        assert!(!r.is_well_formed());
        assert!(!r.contains(&ip("::")));
    }

    #[test]
    fn test_ipv4_contains() {
        let r = range("38.100.21.0/24");
        assert!(r.contains(&ip("38.100.21.77")));
        assert!(r.contains(&ip("38.100.21.0")));
        assert!(r.contains(&ip("38.100.21.255")));
        assert!(!r.contains(&ip("38.100.22.1")));
        assert!(!r.contains(&ip("38.100.20.255")));
    }

    #[test]
    fn test_ipv4_odd_prefix() {
        let r = range("38.100.19.8/29");
        assert!(r.contains(&ip("38.100.19.8")));
        assert!(r.contains(&ip("38.100.19.15")));
        assert!(!r.contains(&ip("38.100.19.16")));
        assert!(!r.contains(&ip("38.100.19.7")));
    }

    #[test]
    fn test_ipv4_unaligned_base_is_masked() {
        // Host bits in the base are ignored.
        let r = range("10.1.2.3/8");
        assert!(r.contains(&ip("10.200.0.1")));
    }

    #[test]
    fn test_zero_prefix_matches_whole_family() {
        let v4 = range("0.0.0.0/0");
        assert!(v4.contains(&ip("1.2.3.4")));
        assert!(v4.contains(&ip("255.255.255.255")));
        assert!(!v4.contains(&ip("::1")));

        let v6 = range("::/0");
        assert!(v6.contains(&ip("2001:db8::1")));
        assert!(!v6.contains(&ip("1.2.3.4")));
    }

    #[test]
    fn test_full_prefix_matches_exact_address() {
        let v4 = range("192.168.1.1/32");
        assert!(v4.contains(&ip("192.168.1.1")));
        assert!(!v4.contains(&ip("192.168.1.2")));

        let v6 = range("2001:db8::5/128");
        assert!(v6.contains(&ip("2001:db8::5")));
        assert!(!v6.contains(&ip("2001:db8::6")));
    }

    #[test]
    fn test_ipv6_contains() {
        let r = range("2001:db8::/32");
        assert!(r.contains(&ip("2001:db8:1:2::5")));
        assert!(!r.contains(&ip("2001:db9::1")));
    }

    #[test]
    fn test_ipv6_partial_byte() {
        // /36 leaves four bits of the fifth byte significant.
        let r = range("2001:db8:f000::/36");
        assert!(r.contains(&ip("2001:db8:f0ff::1")));
        assert!(r.contains(&ip("2001:db8:ffff::1")));
        assert!(!r.contains(&ip("2001:db8:e000::1")));
    }

    #[test]
    fn test_family_mismatch_never_matches() {
        let v4 = range("0.0.0.0/0");
        assert!(!v4.contains(&ip("::ffff:1.2.3.4")));

        let mapped = range("::ffff:0:0/96");
        assert!(!mapped.contains(&ip("1.2.3.4")));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use ipnet::IpNet;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn ipv4() -> impl Strategy<Value = IpAddr> {
        any::<u32>().prop_map(|v| IpAddr::V4(Ipv4Addr::from(v)))
    }

    fn ipv6() -> impl Strategy<Value = IpAddr> {
        any::<u128>().prop_map(|v| IpAddr::V6(Ipv6Addr::from(v)))
    }

    proptest! {
        /// Agrees with ipnet's containment for every valid IPv4 prefix.
        #[test]
        fn prop_ipv4_matches_ipnet(addr in ipv4(), base in ipv4(), prefix in 0u8..=32) {
            let net = IpNet::new(base, prefix).unwrap();
            prop_assert_eq!(in_subnet(&addr, &base, prefix), net.contains(&addr));
        }

        /// Agrees with ipnet's containment for every valid IPv6 prefix.
        #[test]
        fn prop_ipv6_matches_ipnet(addr in ipv6(), base in ipv6(), prefix in 0u8..=128) {
            let net = IpNet::new(base, prefix).unwrap();
            prop_assert_eq!(in_subnet(&addr, &base, prefix), net.contains(&addr));
        }

        /// The base address is always inside its own range.
        #[test]
        fn prop_base_is_contained(base in prop_oneof![ipv4(), ipv6()], prefix in 0u8..=32) {
            prop_assert!(in_subnet(&base, &base, prefix));
        }

        /// Cross-family checks are always false, whatever the bits.
        #[test]
        fn prop_cross_family_never_matches(v4 in ipv4(), v6 in ipv6(), prefix in 0u8..=32) {
            prop_assert!(!in_subnet(&v4, &v6, prefix));
            prop_assert!(!in_subnet(&v6, &v4, prefix));
        }
    }
}
