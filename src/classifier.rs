//! Allow/deny classification of a single request.

use crate::blocklist::BlockList;
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenyReason {
    /// Source address is inside a blocked network.
    IpRange,
    /// User-Agent matched a bad-bot signature.
    UserAgent,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::IpRange => "ip-range",
            DenyReason::UserAgent => "user-agent",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

impl Verdict {
    pub fn is_deny(&self) -> bool {
        matches!(self, Verdict::Deny(_))
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Verdict::Allow => None,
            Verdict::Deny(reason) => Some(*reason),
        }
    }
}

/// A verdict plus the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Text of the matching range or signature; `None` for `Allow`.
    pub rule: Option<String>,
}

/// Classifies requests against a shared, immutable block list.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    block_list: Arc<BlockList>,
}

impl RequestClassifier {
    pub fn new(block_list: Arc<BlockList>) -> Self {
        Self { block_list }
    }

    pub fn block_list(&self) -> &BlockList {
        &self.block_list
    }

    /// Classify a request by client address and User-Agent.
    ///
    /// A missing address or an empty User-Agent is no signal, never a reason
    /// to deny.
    pub fn classify(&self, client_ip: Option<IpAddr>, user_agent: Option<&str>) -> Verdict {
        self.explain(client_ip, user_agent).verdict
    }

    /// Like [`classify`](Self::classify), also reporting the matching rule.
    pub fn explain(&self, client_ip: Option<IpAddr>, user_agent: Option<&str>) -> Classification {
        if let Some(ip) = client_ip {
            if let Some(range) = self.block_list.matching_range(&ip) {
                debug!(ip = %ip, range = %range, "Client address in blocked range");
                return Classification {
                    verdict: Verdict::Deny(DenyReason::IpRange),
                    rule: Some(range.to_string()),
                };
            }
        }

        if let Some(ua) = user_agent.filter(|ua| !ua.is_empty()) {
            if let Some(signature) = self.block_list.matching_signature(ua) {
                debug!(user_agent = %ua, signature = %signature, "User-Agent matched signature");
                return Classification {
                    verdict: Verdict::Deny(DenyReason::UserAgent),
                    rule: Some(signature.to_string()),
                };
            }
        }

        Classification {
            verdict: Verdict::Allow,
            rule: None,
        }
    }
}
