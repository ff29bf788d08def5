use chrono::Utc;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{DataEnvelope, GameDetails, GameVotes, UniverseResponse};
use crate::config::{RequestConfig, RobloxConfig};
use crate::error::{RobloxError, RobloxResult};
use crate::storage::Snapshot;

/// Upper bound on a single backoff sleep, regardless of retry count.
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Client for the Roblox universe, game-details, and votes endpoints.
#[derive(Clone)]
pub struct RobloxClient {
    client: Client,
    apis_base_url: String,
    games_base_url: String,
    place_id: u64,
    request_config: RequestConfig,
    version_pattern: Regex,
}

impl RobloxClient {
    /// Create a new Roblox client for the given place.
    pub fn new(
        place_id: u64,
        config: &RobloxConfig,
        request_config: RequestConfig,
    ) -> RobloxResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(RobloxError::Http)?;

        let version_pattern = Regex::new(r"(?i)v?(\d+\.\d+\.\d+)").map_err(|e| {
            RobloxError::InvalidResponse {
                message: format!("Invalid version pattern: {}", e),
            }
        })?;

        Ok(Self {
            client,
            apis_base_url: config.apis_base_url.trim_end_matches('/').to_string(),
            games_base_url: config.games_base_url.trim_end_matches('/').to_string(),
            place_id,
            request_config,
            version_pattern,
        })
    }

    /// Fetch a full game snapshot, retrying with exponential backoff.
    pub async fn fetch_snapshot(&self) -> RobloxResult<Snapshot> {
        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = self.retry_delay(retries);
                warn!(
                    place_id = self.place_id,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Roblox snapshot fetch"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.fetch_snapshot_once().await {
                Ok(snapshot) => {
                    let latency = start.elapsed();
                    info!(
                        place_id = self.place_id,
                        visits = snapshot.visits,
                        latency_ms = latency.as_millis(),
                        "Snapshot fetched"
                    );
                    return Ok(snapshot);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        place_id = self.place_id,
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Snapshot fetch failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(RobloxError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Exponential backoff for the given retry number, capped so a large
    /// configured retry count cannot overflow or sleep unboundedly.
    fn retry_delay(&self, retry: u32) -> Duration {
        let backoff = self
            .request_config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(retry - 1));
        Duration::from_millis(backoff.min(MAX_RETRY_DELAY_MS))
    }

    /// Look up the universe id for the configured place.
    pub async fn fetch_universe_id(&self) -> RobloxResult<i64> {
        let url = format!(
            "{}/universes/v1/places/{}/universe",
            self.apis_base_url, self.place_id
        );
        let response: UniverseResponse = self.get_json(&url).await?;
        Ok(response.universe_id)
    }

    /// Execute one full fetch: universe lookup, details, votes.
    async fn fetch_snapshot_once(&self) -> RobloxResult<Snapshot> {
        let universe_id = self.fetch_universe_id().await?;

        debug!(
            place_id = self.place_id,
            universe_id, "Fetching game details and votes"
        );

        let details_url = format!(
            "{}/v1/games?universeIds={}",
            self.games_base_url, universe_id
        );
        let details: DataEnvelope<GameDetails> = self.get_json(&details_url).await?;
        let details = details
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RobloxError::InvalidResponse {
                message: format!("No game details for universe {}", universe_id),
            })?;

        let votes_url = format!(
            "{}/v1/games/votes?universeIds={}",
            self.games_base_url, universe_id
        );
        let votes: DataEnvelope<GameVotes> = self.get_json(&votes_url).await?;
        let votes = votes
            .data
            .into_iter()
            .next()
            .ok_or_else(|| RobloxError::InvalidResponse {
                message: format!("No vote data for universe {}", universe_id),
            })?;

        let version = self.parse_version(&details.name);

        Ok(Snapshot {
            collected_at: Utc::now(),
            universe_id,
            name: details.name,
            visits: details.visits,
            playing: details.playing,
            favorites: details.favorites,
            up_votes: votes.up_votes,
            down_votes: votes.down_votes,
            version,
        })
    }

    /// Execute a single GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> RobloxResult<T> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                RobloxError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                RobloxError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RobloxError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RobloxError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    /// Extract a semantic version from the game title, if present.
    pub fn parse_version(&self, title: &str) -> Option<String> {
        self.version_pattern
            .captures(title)
            .map(|captures| captures[1].to_string())
    }

    /// The configured place id.
    pub fn place_id(&self) -> u64 {
        self.place_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client() -> RobloxClient {
        let config = RobloxConfig {
            apis_base_url: "https://apis.roblox.com".to_string(),
            games_base_url: "https://games.roblox.com".to_string(),
        };
        RobloxClient::new(696_347_899, &config, RequestConfig::default())
            .expect("Failed to create client")
    }

    #[test]
    fn test_client_creation() {
        let client = create_test_client();
        assert_eq!(client.place_id(), 696_347_899);
    }

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        let config = RobloxConfig {
            apis_base_url: "https://apis.roblox.com".to_string(),
            games_base_url: "https://games.roblox.com".to_string(),
        };
        let request_config = RequestConfig {
            timeout_ms: 5000,
            max_retries: 80,
            retry_delay_ms: 1000,
        };
        let client = RobloxClient::new(1, &config, request_config).unwrap();

        assert_eq!(client.retry_delay(1), Duration::from_millis(1000));
        assert_eq!(client.retry_delay(2), Duration::from_millis(2000));
        assert_eq!(client.retry_delay(3), Duration::from_millis(4000));
        // Retry 80 would shift past u64 range; the delay stays capped.
        assert_eq!(client.retry_delay(80), Duration::from_millis(60_000));
    }

    #[test]
    fn test_parse_version_with_prefix() {
        let client = create_test_client();
        assert_eq!(
            client.parse_version("Tower Defense v1.2.3"),
            Some("1.2.3".to_string())
        );
    }

    #[test]
    fn test_parse_version_without_prefix() {
        let client = create_test_client();
        assert_eq!(
            client.parse_version("Tower Defense 10.0.1 Update"),
            Some("10.0.1".to_string())
        );
    }

    #[test]
    fn test_parse_version_case_insensitive() {
        let client = create_test_client();
        assert_eq!(
            client.parse_version("Tower Defense V2.0.0"),
            Some("2.0.0".to_string())
        );
    }

    #[test]
    fn test_parse_version_absent() {
        let client = create_test_client();
        assert_eq!(client.parse_version("Tower Defense"), None);
        assert_eq!(client.parse_version("Update 2"), None);
    }
}
