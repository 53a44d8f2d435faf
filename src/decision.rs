//! Decision returned to the proxy for each request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the proxy should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Allow,
    Block,
}

/// Agent decision for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,

    /// Response status for blocked requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Headers added to the block response.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub block_headers: BTreeMap<String, String>,

    /// Tags for audit logging.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            action: DecisionAction::Allow,
            status: None,
            block_headers: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    pub fn block(status: u16) -> Self {
        Self {
            action: DecisionAction::Block,
            status: Some(status),
            block_headers: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_block_header(mut self, name: &str, value: &str) -> Self {
        self.block_headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn is_block(&self) -> bool {
        self.action == DecisionAction::Block
    }
}
