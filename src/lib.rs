//! Bad Bot Agent for Zentinel.
//!
//! Blocks requests from known abusive crawlers and from blocked networks.
//!
//! # Features
//!
//! - **Network Ranges** - Block client addresses inside IPv4/IPv6 CIDR ranges
//! - **User-Agent Signatures** - Literal prefixes (`^HTTrack`) are matched without a
//!   regex engine; anything else is a case-insensitive regex
//! - **Built-in Lists** - Ships with a default bad-bot list and blocked ranges
//! - **List Files** - Extra signatures and ranges from plain text or JSON files
//! - **Fail-Fast Configuration** - An invalid CIDR or regex stops startup
//!
//! # Example Configuration
//!
//! ```yaml
//! settings:
//!   enabled: true
//!   block_status: 403
//!
//! patterns:
//!   include_defaults: true
//!   entries:
//!     - "^EvilScraper"
//!
//! ip_ranges:
//!   entries:
//!     - "203.0.113.0/24"
//! ```
//!
//! # Library Use
//!
//! ```
//! use std::sync::Arc;
//! use zentinel_agent_bad_bot::{BlockList, DenyReason, RequestClassifier, Verdict};
//!
//! let list = BlockList::builder()
//!     .add_ip_range("2001:db8::/32")
//!     .build()
//!     .unwrap();
//! let classifier = RequestClassifier::new(Arc::new(list));
//!
//! let verdict = classifier.classify("2001:db8::1".parse().ok(), Some("curl/8.0"));
//! assert_eq!(verdict, Verdict::Deny(DenyReason::IpRange));
//! ```

pub mod agent;
pub mod blocklist;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod defaults;
pub mod error;
pub mod server;
pub mod signature;
pub mod subnet;

pub use agent::{AgentRequest, BadBotAgent};
pub use blocklist::{BlockList, BlockListBuilder};
pub use classifier::{Classification, DenyReason, RequestClassifier, Verdict};
pub use config::Config;
pub use decision::Decision;
pub use error::ConfigError;
pub use signature::Signature;
pub use subnet::NetworkRange;
