//! ZeroTier Central member listing and GitHub release lookup.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use ztwatch_core::config::NetworkConfig;
use ztwatch_core::{MemberFacts, normalize_version};
use ztwatch_health::{FetchFailure, MemberBatch, MemberSource};

use crate::error::Exhausted;
use crate::http::HttpClient;

pub const CENTRAL_API_URL: &str = "https://api.zerotier.com/api/v1";
pub const RELEASES_URL: &str = "https://api.github.com/repos/zerotier/ZeroTierOne/releases/latest";

/// Pause between networks to stay under the Central rate limit.
const NETWORK_PAUSE: Duration = Duration::from_secs(1);

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMember {
    node_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    client_version: Option<String>,
    #[serde(default)]
    last_seen: Option<i64>,
    #[serde(default)]
    config: ApiMemberConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiMemberConfig {
    #[serde(default)]
    ip_assignments: Vec<String>,
}

impl From<ApiMember> for MemberFacts {
    fn from(m: ApiMember) -> Self {
        MemberFacts {
            node_id: m.node_id,
            name: m.name,
            client_version: m.client_version,
            last_seen_ms: m.last_seen,
            ip_assignments: m.config.ip_assignments,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

// ── Client ─────────────────────────────────────────────────────────

/// Fetches members of every configured network and the latest client
/// release.
#[derive(Debug, Clone)]
pub struct ZeroTierClient {
    http: HttpClient,
    networks: Vec<NetworkConfig>,
    central_url: String,
    releases_url: String,
}

impl ZeroTierClient {
    pub fn new(http: HttpClient, networks: Vec<NetworkConfig>) -> Self {
        Self {
            http,
            networks,
            central_url: CENTRAL_API_URL.to_string(),
            releases_url: RELEASES_URL.to_string(),
        }
    }

    /// Point at different endpoints (for testing).
    pub fn with_urls(mut self, central_url: impl Into<String>, releases_url: impl Into<String>) -> Self {
        self.central_url = central_url.into();
        self.releases_url = releases_url.into();
        self
    }

    /// Members of one network.
    pub async fn network_members(&self, network: &NetworkConfig) -> Result<Vec<MemberFacts>, Exhausted> {
        let url = format!(
            "{}/network/{}/member",
            self.central_url.trim_end_matches('/'),
            network.network_id
        );
        let members: Vec<ApiMember> = self
            .http
            .fetch_json("zerotier members", || {
                self.http.get(&url).bearer_auth(&network.token)
            })
            .await?;
        debug!(network_id = %network.network_id, count = members.len(), "members fetched");
        Ok(members.into_iter().map(MemberFacts::from).collect())
    }

    /// Latest ZeroTierOne release tag without the leading `v`.
    pub async fn latest_release(&self) -> Result<String, Exhausted> {
        let release: Release = self
            .http
            .fetch_json("latest release", || self.http.get(&self.releases_url))
            .await?;
        Ok(normalize_version(&release.tag_name).unwrap_or(release.tag_name))
    }
}

impl MemberSource for ZeroTierClient {
    async fn fetch_members(&self) -> MemberBatch {
        info!(networks = self.networks.len(), "fetching members");
        let mut batch = MemberBatch::default();
        for (i, network) in self.networks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(NETWORK_PAUSE).await;
            }
            match self.network_members(network).await {
                Ok(members) => batch.members.extend(members),
                Err(e) => {
                    warn!(network_id = %network.network_id, error = %e, "failed to fetch members");
                    batch.failures.push(FetchFailure {
                        target: network.network_id.clone(),
                        attempts: e.attempts,
                        error: e.last.to_string(),
                    });
                }
            }
        }
        batch
    }

    async fn latest_version(&self) -> Result<String, FetchFailure> {
        self.latest_release().await.map_err(|e| FetchFailure {
            target: self.releases_url.clone(),
            attempts: e.attempts,
            error: e.last.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use ztwatch_core::config::HttpConfig;

    use crate::http::RetryPolicy;

    fn http(attempts: u32) -> HttpClient {
        HttpClient::new(&HttpConfig::default())
            .unwrap()
            .with_retry(RetryPolicy {
                attempts,
                base_delay: Duration::ZERO,
                max_jitter: Duration::ZERO,
            })
    }

    fn network(id: &str) -> NetworkConfig {
        NetworkConfig {
            network_id: id.to_string(),
            token: "secret".to_string(),
        }
    }

    #[test]
    fn api_member_parses_central_shape() {
        let raw = json!({
            "id": "8056c2e21c000001-abcdef0123",
            "nodeId": "abcdef0123",
            "name": "nas",
            "lastSeen": 1_760_000_000_000i64,
            "clientVersion": "1.14.2",
            "config": { "ipAssignments": ["10.147.17.5"], "authorized": true }
        });
        let facts: MemberFacts = serde_json::from_value::<ApiMember>(raw).unwrap().into();
        assert_eq!(facts.node_id, "abcdef0123");
        assert_eq!(facts.display_name(), "nas");
        assert_eq!(facts.last_seen_ms, Some(1_760_000_000_000));
        assert_eq!(facts.ip_assignments, vec!["10.147.17.5"]);
    }

    #[test]
    fn api_member_tolerates_missing_fields() {
        let facts: MemberFacts = serde_json::from_value::<ApiMember>(json!({ "nodeId": "abcdef0123" }))
            .unwrap()
            .into();
        assert_eq!(facts.display_name(), "abcdef0123");
        assert!(facts.reported_version().is_none());
        assert!(facts.last_seen_ms.is_none());
        assert!(facts.ip_assignments.is_empty());
    }

    #[tokio::test]
    async fn fetch_members_collects_successes_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/network/good/member"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "nodeId": "abcdef0123", "name": "nas", "clientVersion": "1.14.2" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/network/bad/member"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;

        let client = ZeroTierClient::new(http(2), vec![network("good"), network("bad")])
            .with_urls(server.uri(), format!("{}/releases", server.uri()));
        let batch = client.fetch_members().await;

        assert_eq!(batch.members.len(), 1);
        assert_eq!(batch.members[0].node_id, "abcdef0123");
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].target, "bad");
        assert_eq!(batch.failures[0].attempts, 2);
        assert!(batch.failures[0].error.contains("401"));
    }

    #[tokio::test]
    async fn latest_version_strips_tag_prefix() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tag_name": "v1.16.0" })))
            .mount(&server)
            .await;

        let client = ZeroTierClient::new(http(1), vec![])
            .with_urls(server.uri(), format!("{}/releases", server.uri()));
        assert_eq!(client.latest_version().await.unwrap(), "1.16.0");
    }

    #[tokio::test]
    async fn latest_version_reports_failure_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "no tag" })))
            .expect(3)
            .mount(&server)
            .await;

        let client = ZeroTierClient::new(http(3), vec![])
            .with_urls(server.uri(), format!("{}/releases", server.uri()));
        let failure = client.latest_version().await.unwrap_err();
        assert_eq!(failure.attempts, 3);
    }
}
