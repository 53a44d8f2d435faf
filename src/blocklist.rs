//! Compiled block list: User-Agent signatures and blocked network ranges.

use crate::config::{Config, ListConfig, ListFormat};
use crate::defaults;
use crate::error::ConfigError;
use crate::signature::Signature;
use crate::subnet::NetworkRange;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Immutable, fully validated block list.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    signatures: Vec<Signature>,
    ranges: Vec<NetworkRange>,
}

impl BlockList {
    /// Start a builder preloaded with the built-in lists.
    pub fn builder() -> BlockListBuilder {
        BlockListBuilder::with_defaults()
    }

    /// Build the block list described by a configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut builder = BlockListBuilder::new();

        builder = add_list(builder, &config.patterns, ListKind::Patterns)?;
        builder = add_list(builder, &config.ip_ranges, ListKind::IpRanges)?;

        builder.build()
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn ranges(&self) -> &[NetworkRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty() && self.ranges.is_empty()
    }

    /// First blocked range containing `ip`.
    pub fn matching_range(&self, ip: &IpAddr) -> Option<&NetworkRange> {
        self.ranges.iter().find(|r| r.contains(ip))
    }

    /// First signature matching a User-Agent value.
    pub fn matching_signature(&self, user_agent: &str) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.is_match(user_agent))
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    origin: Option<PathBuf>,
}

impl Entry {
    fn inline(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }

    fn with_origin(self, err: ConfigError) -> ConfigError {
        match self.origin {
            Some(path) => err.in_file(&path),
            None => err,
        }
    }
}

/// Collects raw signatures and CIDR strings, then validates them all at once.
#[derive(Debug, Clone, Default)]
pub struct BlockListBuilder {
    patterns: Vec<Entry>,
    ip_ranges: Vec<Entry>,
}

impl BlockListBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder preloaded with the built-in signatures and ranges.
    pub fn with_defaults() -> Self {
        Self::new()
            .add_patterns(defaults::bad_bot_patterns())
            .add_ip_ranges(defaults::blocked_ip_ranges())
    }

    pub fn add_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(Entry::inline(pattern));
        self
    }

    pub fn add_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Entry::inline));
        self
    }

    pub fn add_ip_range(mut self, cidr: impl Into<String>) -> Self {
        self.ip_ranges.push(Entry::inline(cidr));
        self
    }

    pub fn add_ip_ranges<I, S>(mut self, cidrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_ranges.extend(cidrs.into_iter().map(Entry::inline));
        self
    }

    /// Append signatures read from a list file.
    pub fn add_patterns_from_file(mut self, path: &Path, format: ListFormat) -> Result<Self, ConfigError> {
        self.patterns.extend(load_list(path, format)?);
        Ok(self)
    }

    /// Append CIDR ranges read from a list file.
    pub fn add_ip_ranges_from_file(mut self, path: &Path, format: ListFormat) -> Result<Self, ConfigError> {
        self.ip_ranges.extend(load_list(path, format)?);
        Ok(self)
    }

    pub fn clear_patterns(mut self) -> Self {
        self.patterns.clear();
        self
    }

    pub fn clear_ip_ranges(mut self) -> Self {
        self.ip_ranges.clear();
        self
    }

    /// Compile every signature and parse every range. The first invalid
    /// entry aborts the build.
    pub fn build(self) -> Result<BlockList, ConfigError> {
        let mut signatures = Vec::with_capacity(self.patterns.len());
        for entry in self.patterns {
            match Signature::compile(&entry.value) {
                Ok(signature) => signatures.push(signature),
                Err(e) => return Err(entry.with_origin(e)),
            }
        }

        let mut ranges = Vec::with_capacity(self.ip_ranges.len());
        for entry in self.ip_ranges {
            let range: NetworkRange = match entry.value.parse() {
                Ok(range) => range,
                Err(e) => return Err(entry.with_origin(e)),
            };
            if !range.is_well_formed() {
                warn!(
                    range = %range,
                    max_prefix_len = range.max_prefix_len(),
                    "Prefix length exceeds address width, range will never match"
                );
            }
            ranges.push(range);
        }

        let prefix_signatures = signatures.iter().filter(|s| s.is_prefix()).count();
        info!(
            signatures = signatures.len(),
            prefix_signatures,
            regex_signatures = signatures.len() - prefix_signatures,
            ranges = ranges.len(),
            "Block list compiled"
        );

        Ok(BlockList { signatures, ranges })
    }
}

#[derive(Debug, Clone, Copy)]
enum ListKind {
    Patterns,
    IpRanges,
}

fn add_list(
    mut builder: BlockListBuilder,
    list: &ListConfig,
    kind: ListKind,
) -> Result<BlockListBuilder, ConfigError> {
    if list.include_defaults {
        builder = match kind {
            ListKind::Patterns => builder.add_patterns(defaults::bad_bot_patterns()),
            ListKind::IpRanges => builder.add_ip_ranges(defaults::blocked_ip_ranges()),
        };
    }

    builder = match kind {
        ListKind::Patterns => builder.add_patterns(list.entries.iter().cloned()),
        ListKind::IpRanges => builder.add_ip_ranges(list.entries.iter().cloned()),
    };

    for file in &list.files {
        builder = match kind {
            ListKind::Patterns => builder.add_patterns_from_file(&file.path, file.format)?,
            ListKind::IpRanges => builder.add_ip_ranges_from_file(&file.path, file.format)?,
        };
    }

    Ok(builder)
}

/// Load list entries from a file.
fn load_list(path: &Path, format: ListFormat) -> Result<Vec<Entry>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let values: Vec<String> = match format {
        ListFormat::Plain => plain_entries(&content).map(str::to_string).collect(),
        ListFormat::Json => load_json_list(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?,
    };

    debug!(path = %path.display(), entries = values.len(), "List file loaded");

    Ok(values
        .into_iter()
        .map(|value| Entry {
            value,
            origin: Some(path.to_path_buf()),
        })
        .collect())
}

/// Entries of a plain list: one per line, blank lines and `#` comments skipped.
pub(crate) fn plain_entries(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Load a JSON list (array of strings).
fn load_json_list(content: &str) -> Result<Vec<String>, serde_json::Error> {
    let values: Vec<String> = serde_json::from_str(content)?;
    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}
