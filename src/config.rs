//! Configuration types for the Bad Bot agent.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Root configuration for the Bad Bot agent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Global settings.
    #[serde(default)]
    pub settings: Settings,

    /// Client IP extraction configuration.
    #[serde(default)]
    pub ip_extraction: IpExtractionConfig,

    /// Header carrying the User-Agent.
    #[serde(default = "default_user_agent_header")]
    pub user_agent_header: String,

    /// Bad-bot User-Agent signatures.
    #[serde(default)]
    pub patterns: ListConfig,

    /// Blocked network ranges (CIDR).
    #[serde(default)]
    pub ip_ranges: ListConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            ip_extraction: IpExtractionConfig::default(),
            user_agent_header: default_user_agent_header(),
            patterns: ListConfig::default(),
            ip_ranges: ListConfig::default(),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    /// Master enable/disable switch.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log blocked requests.
    #[serde(default = "default_true")]
    pub log_blocked: bool,

    /// Log allowed requests.
    #[serde(default)]
    pub log_allowed: bool,

    /// HTTP status returned for blocked requests.
    #[serde(default = "default_block_status")]
    pub block_status: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            log_blocked: true,
            log_allowed: false,
            block_status: default_block_status(),
        }
    }
}

/// Client IP extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IpExtractionConfig {
    /// Headers to check for client IP, in order of preference.
    #[serde(default = "default_ip_headers")]
    pub headers: Vec<String>,

    /// Use first IP from X-Forwarded-For (true) or last IP (false).
    #[serde(default = "default_true")]
    pub use_first_ip: bool,

    /// Fall back to the connection's peer address when no header yields an IP.
    #[serde(default = "default_true")]
    pub use_peer_address: bool,
}

impl Default for IpExtractionConfig {
    fn default() -> Self {
        Self {
            headers: default_ip_headers(),
            use_first_ip: true,
            use_peer_address: true,
        }
    }
}

fn default_ip_headers() -> Vec<String> {
    vec![
        "x-forwarded-for".to_string(),
        "x-real-ip".to_string(),
        "cf-connecting-ip".to_string(),
    ]
}

/// A list of signatures or CIDR ranges.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListConfig {
    /// Start from the built-in list.
    #[serde(default = "default_true")]
    pub include_defaults: bool,

    /// Extra entries, appended after the defaults.
    #[serde(default)]
    pub entries: Vec<String>,

    /// Files with further entries, appended after `entries`.
    #[serde(default)]
    pub files: Vec<ListFile>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            entries: Vec::new(),
            files: Vec::new(),
        }
    }
}

/// A list file on disk.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListFile {
    /// Path to the file.
    pub path: PathBuf,

    /// File format.
    #[serde(default)]
    pub format: ListFormat,
}

/// List file format.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    /// Plain text, one entry per line, `#` comments.
    #[default]
    Plain,
    /// JSON array of strings.
    Json,
}

fn default_user_agent_header() -> String {
    "user-agent".to_string()
}

fn default_block_status() -> u16 {
    403
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let expanded = expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    ///
    /// Entry syntax (CIDR, regex) is checked when the block list is built.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(400..=599).contains(&self.settings.block_status) {
            anyhow::bail!(
                "block_status ({}) must be an HTTP error status (400-599)",
                self.settings.block_status
            );
        }

        if self.user_agent_header.trim().is_empty() {
            anyhow::bail!("user_agent_header must not be empty");
        }

        if self.ip_extraction.headers.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("ip_extraction.headers must not contain empty header names");
        }

        for (kind, list) in [("patterns", &self.patterns), ("ip_ranges", &self.ip_ranges)] {
            for file in &list.files {
                if !file.path.exists() {
                    anyhow::bail!("{} file does not exist: {}", kind, file.path.display());
                }
            }
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# Bad Bot Agent Configuration

settings:
  enabled: true
  log_blocked: true
  log_allowed: false
  block_status: 403            # status returned for blocked requests

# Client IP extraction from request headers
ip_extraction:
  headers:
    - "x-forwarded-for"
    - "x-real-ip"
    - "cf-connecting-ip"
  use_first_ip: true           # Use first IP from X-Forwarded-For
  use_peer_address: true       # Fall back to the connection peer address

user_agent_header: "user-agent"

# User-Agent signatures.
# "^Literal" without regex metacharacters is a case-insensitive prefix match,
# anything else is a case-insensitive regex searched anywhere in the header.
patterns:
  include_defaults: true
  entries:
    - "^EvilScraper"
    - "(?:sqlmap|nikto)/"
  files:
    - path: "/etc/zentinel/bad-bots.txt"
      format: plain            # plain or json

# Blocked networks in CIDR notation (IPv4 and IPv6)
ip_ranges:
  include_defaults: true
  entries:
    - "203.0.113.0/24"
    - "2001:db8:dead::/48"
  files: []
"#
        .to_string()
    }
}

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

/// Expand environment variables in the format ${VAR_NAME}. Unset variables
/// expand to the empty string.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &Captures| std::env::var(&caps[1]).unwrap_or_default())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert!(settings.log_blocked);
        assert!(!settings.log_allowed);
        assert_eq!(settings.block_status, 403);
    }

    #[test]
    fn test_default_ip_extraction() {
        let config = IpExtractionConfig::default();
        assert_eq!(config.headers.len(), 3);
        assert_eq!(config.headers[0], "x-forwarded-for");
        assert!(config.use_first_ip);
        assert!(config.use_peer_address);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.settings.enabled);
        assert_eq!(config.user_agent_header, "user-agent");
        assert!(config.patterns.include_defaults);
        assert!(config.ip_ranges.include_defaults);
        assert!(config.patterns.entries.is_empty());
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("BAD_BOT_TEST_LIST", "/srv/lists");
        let input = "path: \"${BAD_BOT_TEST_LIST}/bots.txt\"";
        let result = expand_env_vars(input);
        assert_eq!(result, "path: \"/srv/lists/bots.txt\"");
        std::env::remove_var("BAD_BOT_TEST_LIST");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let input = "path: \"${BAD_BOT_NONEXISTENT_VAR}\"";
        assert_eq!(expand_env_vars(input), "path: \"\"");
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
settings:
  enabled: false
  block_status: 429

user_agent_header: "X-Client-Agent"

patterns:
  include_defaults: false
  entries:
    - "^Java"
    - "Baiduspider"

ip_ranges:
  entries:
    - "38.100.21.0/24"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(!config.settings.enabled);
        assert_eq!(config.settings.block_status, 429);
        assert_eq!(config.user_agent_header, "X-Client-Agent");
        assert!(!config.patterns.include_defaults);
        assert_eq!(config.patterns.entries, vec!["^Java", "Baiduspider"]);
        assert!(config.ip_ranges.include_defaults);
        assert_eq!(config.ip_ranges.entries.len(), 1);
    }

    #[test]
    fn test_parse_list_files() {
        let file = NamedTempFile::new().unwrap();
        let yaml = format!(
            "patterns:\n  files:\n    - path: \"{}\"\n      format: json\n",
            file.path().display()
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.patterns.files.len(), 1);
        assert_eq!(config.patterns.files[0].format, ListFormat::Json);
    }

    #[test]
    fn test_validate_block_status() {
        let mut config = Config::default();
        config.settings.block_status = 200;
        assert!(config.validate().is_err());

        config.settings.block_status = 451;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_user_agent_header() {
        let config = Config {
            user_agent_header: "  ".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_list_file() {
        let mut config = Config::default();
        config.ip_ranges.files.push(ListFile {
            path: PathBuf::from("/nonexistent/bad-bot/ranges.txt"),
            format: ListFormat::Plain,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"settings:\n  log_allowed: true\n").unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.settings.log_allowed);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(&Config::example()).unwrap();
        assert_eq!(config.patterns.entries.len(), 2);
        assert_eq!(config.ip_ranges.entries.len(), 2);
        assert_eq!(config.patterns.files[0].format, ListFormat::Plain);
    }
}
