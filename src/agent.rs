//! Bad Bot agent implementation.

use crate::blocklist::BlockList;
use crate::classifier::{RequestClassifier, Verdict};
use crate::config::{Config, IpExtractionConfig};
use crate::decision::Decision;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Request as seen by the agent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AgentRequest {
    /// Address of the connecting peer, if the proxy knows it.
    #[serde(default)]
    pub peer_addr: Option<IpAddr>,

    /// Request headers. Names are matched case-insensitively.
    #[serde(default)]
    pub headers: HashMap<String, Vec<String>>,
}

impl AgentRequest {
    pub fn new(peer_addr: Option<IpAddr>) -> Self {
        Self {
            peer_addr,
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }
}

/// Bad Bot agent.
pub struct BadBotAgent {
    config: Arc<Config>,
    classifier: RequestClassifier,
}

impl BadBotAgent {
    /// Create a new agent, compiling the block list from configuration.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let block_list = BlockList::from_config(&config)?;
        Ok(Self::with_block_list(config, Arc::new(block_list)))
    }

    /// Create an agent around an already compiled block list.
    pub fn with_block_list(config: Config, block_list: Arc<BlockList>) -> Self {
        info!(
            enabled = config.settings.enabled,
            signatures = block_list.signatures().len(),
            ranges = block_list.ranges().len(),
            "Bad Bot agent initialized"
        );

        Self {
            config: Arc::new(config),
            classifier: RequestClassifier::new(block_list),
        }
    }

    pub fn classifier(&self) -> &RequestClassifier {
        &self.classifier
    }

    /// Decide what to do with a request.
    pub fn on_request(&self, request: &AgentRequest) -> Decision {
        // Check global kill switch
        if !self.config.settings.enabled {
            debug!("Bad Bot agent disabled globally");
            return Decision::allow().with_tag("bad-bot:disabled");
        }

        let headers = flatten_headers(&request.headers);

        let ip = extract_client_ip(&headers, &self.config.ip_extraction)
            .or(if self.config.ip_extraction.use_peer_address {
                request.peer_addr
            } else {
                None
            });
        let user_agent = headers
            .get(&self.config.user_agent_header.to_lowercase())
            .map(String::as_str);

        if ip.is_none() {
            debug!("No client IP available, checking User-Agent only");
        }

        let result = self.classifier.explain(ip, user_agent);

        match result.verdict {
            Verdict::Deny(reason) => {
                if self.config.settings.log_blocked {
                    info!(
                        ip = ?ip,
                        user_agent = ?user_agent,
                        reason = %reason,
                        rule = ?result.rule,
                        "Blocking request"
                    );
                }

                Decision::block(self.config.settings.block_status)
                    .with_block_header("x-bad-bot-blocked", "true")
                    .with_block_header("x-bad-bot-reason", reason.as_str())
                    .with_tag("bad-bot:blocked")
                    .with_tag(&format!("bad-bot:{}", reason))
            }
            Verdict::Allow => {
                if self.config.settings.log_allowed {
                    debug!(ip = ?ip, user_agent = ?user_agent, "Allowing request");
                }

                Decision::allow().with_tag("bad-bot:allowed")
            }
        }
    }
}

/// Extract client IP from request headers.
pub fn extract_client_ip(
    headers: &HashMap<String, String>,
    config: &IpExtractionConfig,
) -> Option<IpAddr> {
    for header_name in &config.headers {
        let Some(value) = headers.get(&header_name.to_lowercase()) else {
            continue;
        };

        // X-Forwarded-For: client, proxy1, proxy2
        let candidate = if config.use_first_ip {
            value.split(',').next()
        } else {
            value.split(',').next_back()
        };

        if let Some(ip) = candidate.and_then(|s| s.trim().parse().ok()) {
            return Some(ip);
        }
    }
    None
}

/// Flatten multi-value headers to their first value, with lowercase names.
/// Lowercase header names and keep the first value of each. When several
/// spellings of one name are present, the first in sorted key order wins.
fn flatten_headers(headers: &HashMap<String, Vec<String>>) -> HashMap<String, String> {
    let sorted: BTreeMap<&String, &Vec<String>> = headers.iter().collect();
    let mut flat = HashMap::with_capacity(sorted.len());
    for (name, values) in sorted {
        flat.entry(name.to_lowercase())
            .or_insert_with(|| values.first().cloned().unwrap_or_default());
    }
    flat
}
