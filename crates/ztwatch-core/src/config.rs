//! ztwatch.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::Language;

/// Problems found while validating a parsed configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least one network must be configured")]
    NoNetworks,

    #[error("network {0:?} has an empty id or token")]
    IncompleteNetwork(String),

    #[error("member_ids must list at least one node id")]
    NoMembers,

    #[error("poll_interval_secs must be positive")]
    ZeroPollInterval,

    #[error("anomaly_threshold_secs must not be negative")]
    NegativeAnomalyThreshold,

    #[error("offline_tiers must contain at least one tier")]
    EmptyLadder,

    #[error("offline tier {0:?} must have a positive level and boundary")]
    InvalidTier(String),

    #[error("offline tier {0:?} must have a larger boundary and level than the tier before it")]
    NonIncreasingTier(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub language: Language,
    pub networks: Vec<NetworkConfig>,
    /// Node ids to evaluate; members outside this list are ignored.
    pub member_ids: Vec<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Slack added to the poll interval before a last-seen jump counts as an anomaly.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold_secs: i64,
    /// Latest version assumed when neither GitHub nor the store can supply one.
    #[serde(default = "default_fallback_version")]
    pub fallback_version: String,
    #[serde(default = "default_offline_tiers")]
    pub offline_tiers: Vec<OfflineTier>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: String,
    /// ZeroTier Central API token with read access to the network.
    pub token: String,
}

/// One rung of the offline alert ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineTier {
    /// Short label, e.g. "15m".
    pub key: String,
    /// Offline seconds that must be exceeded to reach this tier.
    pub seconds: i64,
    pub level: u8,
}

impl OfflineTier {
    pub fn new(key: &str, seconds: i64, level: u8) -> Self {
        Self {
            key: key.to_string(),
            seconds,
            level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

fn default_poll_interval() -> u64 {
    300
}

fn default_anomaly_threshold() -> i64 {
    200
}

fn default_fallback_version() -> String {
    "1.14.2".to_string()
}

fn default_offline_tiers() -> Vec<OfflineTier> {
    vec![
        OfflineTier::new("5m", 300, 1),
        OfflineTier::new("15m", 900, 2),
        OfflineTier::new("1h", 3600, 3),
    ]
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5
}

fn default_http_timeout() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_probe_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay(),
            timeout_secs: default_http_timeout(),
        }
    }
}

impl MonitorConfig {
    /// Read, parse and validate a config file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.networks.is_empty() {
            return Err(ConfigError::NoNetworks);
        }
        if let Some(net) = self
            .networks
            .iter()
            .find(|n| n.network_id.trim().is_empty() || n.token.trim().is_empty())
        {
            return Err(ConfigError::IncompleteNetwork(net.network_id.clone()));
        }
        if self.member_ids.iter().all(|id| id.trim().is_empty()) {
            return Err(ConfigError::NoMembers);
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.anomaly_threshold_secs < 0 {
            return Err(ConfigError::NegativeAnomalyThreshold);
        }
        validate_tiers(&self.offline_tiers)
    }

    /// Whether `node_id` is in the monitored set.
    pub fn is_monitored(&self, node_id: &str) -> bool {
        self.member_ids.iter().any(|id| id.trim() == node_id)
    }

    /// Config with one placeholder network, for `ztwatchd init`.
    pub fn scaffold(network_id: &str, token: &str, member_ids: &[&str]) -> Self {
        Self {
            language: Language::default(),
            networks: vec![NetworkConfig {
                network_id: network_id.to_string(),
                token: token.to_string(),
            }],
            member_ids: member_ids.iter().map(|id| id.to_string()).collect(),
            poll_interval_secs: default_poll_interval(),
            anomaly_threshold_secs: default_anomaly_threshold(),
            fallback_version: default_fallback_version(),
            offline_tiers: default_offline_tiers(),
            probe: ProbeConfig::default(),
            http: HttpConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

/// Tiers must be listed lowest first, each strictly above the previous one.
pub fn validate_tiers(tiers: &[OfflineTier]) -> Result<(), ConfigError> {
    if tiers.is_empty() {
        return Err(ConfigError::EmptyLadder);
    }
    for tier in tiers {
        if tier.level == 0 || tier.seconds <= 0 {
            return Err(ConfigError::InvalidTier(tier.key.clone()));
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].seconds <= pair[0].seconds || pair[1].level <= pair[0].level {
            return Err(ConfigError::NonIncreasingTier(pair[1].key.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
member_ids = ["abcdef0123"]

[[networks]]
network_id = "8056c2e21c000001"
token = "secret"
"#
    }

    #[test]
    fn parse_minimal_uses_defaults() {
        let config: MonitorConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.language, Language::En);
        assert_eq!(config.poll_interval_secs, 300);
        assert_eq!(config.anomaly_threshold_secs, 200);
        assert_eq!(config.fallback_version, "1.14.2");
        assert_eq!(config.offline_tiers.len(), 3);
        assert_eq!(config.offline_tiers[0], OfflineTier::new("5m", 300, 1));
        assert_eq!(config.http.retry_attempts, 3);
        assert_eq!(config.probe.timeout_secs, 5);
        assert!(config.telegram.bot_token.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_custom_ladder_and_language() {
        let toml_str = r#"
language = "ru"
member_ids = ["abcdef0123"]
poll_interval_secs = 60

[[networks]]
network_id = "n1"
token = "t1"

[[offline_tiers]]
key = "2m"
seconds = 120
level = 1

[[offline_tiers]]
key = "10m"
seconds = 600
level = 2
"#;
        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.language, Language::Ru);
        assert_eq!(config.offline_tiers.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scaffold_round_trips_through_toml() {
        let config = MonitorConfig::scaffold("n1", "t1", &["abcdef0123"]);
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("abcdef0123"));

        let parsed: MonitorConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.offline_tiers, config.offline_tiers);
    }

    #[test]
    fn validate_rejects_missing_networks_and_members() {
        let mut config = MonitorConfig::scaffold("n1", "t1", &["abcdef0123"]);
        config.networks.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoNetworks));

        let mut config = MonitorConfig::scaffold("n1", "", &["abcdef0123"]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::IncompleteNetwork("n1".to_string()))
        );

        config = MonitorConfig::scaffold("n1", "t1", &[]);
        assert_eq!(config.validate(), Err(ConfigError::NoMembers));
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = MonitorConfig::scaffold("n1", "t1", &["abcdef0123"]);
        config.poll_interval_secs = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPollInterval));
    }

    #[test]
    fn validate_rejects_bad_ladders() {
        assert_eq!(validate_tiers(&[]), Err(ConfigError::EmptyLadder));

        let zero_level = [OfflineTier::new("5m", 300, 0)];
        assert_eq!(
            validate_tiers(&zero_level),
            Err(ConfigError::InvalidTier("5m".to_string()))
        );

        let out_of_order = [
            OfflineTier::new("15m", 900, 2),
            OfflineTier::new("5m", 300, 1),
        ];
        assert_eq!(
            validate_tiers(&out_of_order),
            Err(ConfigError::NonIncreasingTier("5m".to_string()))
        );

        let same_level = [
            OfflineTier::new("5m", 300, 1),
            OfflineTier::new("15m", 900, 1),
        ];
        assert_eq!(
            validate_tiers(&same_level),
            Err(ConfigError::NonIncreasingTier("15m".to_string()))
        );
    }

    #[test]
    fn is_monitored_trims_ids() {
        let config = MonitorConfig::scaffold("n1", "t1", &[" abcdef0123 "]);
        assert!(config.is_monitored("abcdef0123"));
        assert!(!config.is_monitored("0000000000"));
    }

    #[test]
    fn from_file_reads_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ztwatch.toml");
        std::fs::write(&path, minimal_toml()).unwrap();
        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.networks[0].network_id, "8056c2e21c000001");

        std::fs::write(&path, "member_ids = []\nnetworks = []\n").unwrap();
        assert!(MonitorConfig::from_file(&path).is_err());
    }
}
