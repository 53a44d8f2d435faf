//! Built-in bad-bot signatures and blocked ranges.
//!
//! The lists live in `data/` as plain text so they can be updated without
//! touching code.

use crate::blocklist::plain_entries;

const BAD_BOT_PATTERNS: &str = include_str!("../data/bad_bot_patterns.txt");
const BLOCKED_IP_RANGES: &str = include_str!("../data/blocked_ip_ranges.txt");

/// Default User-Agent signatures, in file order.
pub fn bad_bot_patterns() -> impl Iterator<Item = &'static str> {
    plain_entries(BAD_BOT_PATTERNS)
}

/// Default blocked CIDR ranges, in file order.
pub fn blocked_ip_ranges() -> impl Iterator<Item = &'static str> {
    plain_entries(BLOCKED_IP_RANGES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::subnet::NetworkRange;

    #[test]
    fn test_default_patterns_compile() {
        let patterns: Vec<_> = bad_bot_patterns().collect();
        assert!(patterns.len() > 200);
        assert!(patterns.contains(&"^Aboundex"));
        assert!(patterns.contains(&"Yandex"));
        assert!(patterns.iter().all(|p| !p.starts_with('#')));

        for pattern in patterns {
            assert!(Signature::compile(pattern).is_ok(), "{} failed to compile", pattern);
        }
    }

    #[test]
    fn test_default_ranges_parse() {
        let ranges: Vec<NetworkRange> = blocked_ip_ranges()
            .map(|r| r.parse().unwrap())
            .collect();
        assert_eq!(ranges.len(), 10);
        assert!(ranges.iter().all(NetworkRange::is_well_formed));
        assert_eq!(ranges[0].to_string(), "38.100.19.8/29");
    }

    #[test]
    fn test_most_defaults_are_prefixes() {
        let prefix = bad_bot_patterns()
            .filter(|p| Signature::compile(p).unwrap().is_prefix())
            .count();
        assert!(prefix > 150);
    }
}
