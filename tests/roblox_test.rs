//! Integration tests for the Roblox client
//!
//! Tests HTTP client behavior using wiremock for request/response mocking.

use serde_json::json;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use visitfall::config::{RequestConfig, RobloxConfig};
use visitfall::error::RobloxError;
use visitfall::roblox::RobloxClient;

const PLACE_ID: u64 = 696_347_899;
const UNIVERSE_ID: i64 = 123_456;

/// Create a test client pointing both endpoint families at the mock server
fn create_test_client(base_url: &str) -> RobloxClient {
    let config = RobloxConfig {
        apis_base_url: base_url.to_string(),
        games_base_url: base_url.to_string(),
    };

    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0, // No retries for testing
        retry_delay_ms: 100,
    };

    RobloxClient::new(PLACE_ID, &config, request_config).expect("Failed to create client")
}

async fn mount_universe_lookup(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/universes/v1/places/{}/universe",
            PLACE_ID
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "universeId": UNIVERSE_ID
        })))
        .mount(server)
        .await;
}

#[cfg(test)]
mod fetch_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_snapshot_fetch() {
        let mock_server = MockServer::start().await;
        mount_universe_lookup(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .and(query_param("universeIds", UNIVERSE_ID.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{
                    "name": "Tower Defense v2.4.1",
                    "visits": 12_345_678,
                    "playing": 420,
                    "favorites": 99_000
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/games/votes"))
            .and(query_param("universeIds", UNIVERSE_ID.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "upVotes": 5000, "downVotes": 250 }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let snapshot = client.fetch_snapshot().await.expect("Fetch should succeed");

        assert_eq!(snapshot.universe_id, UNIVERSE_ID);
        assert_eq!(snapshot.name, "Tower Defense v2.4.1");
        assert_eq!(snapshot.visits, 12_345_678);
        assert_eq!(snapshot.playing, 420);
        assert_eq!(snapshot.favorites, 99_000);
        assert_eq!(snapshot.up_votes, 5000);
        assert_eq!(snapshot.down_votes, 250);
        assert_eq!(snapshot.version, Some("2.4.1".to_string()));
    }

    #[tokio::test]
    async fn test_snapshot_without_version_in_title() {
        let mock_server = MockServer::start().await;
        mount_universe_lookup(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "name": "Tower Defense", "visits": 100, "playing": 1, "favorites": 2 }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/games/votes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "upVotes": 10, "downVotes": 1 }]
            })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let snapshot = client.fetch_snapshot().await.unwrap();

        assert_eq!(snapshot.version, None);
    }

    #[tokio::test]
    async fn test_universe_lookup() {
        let mock_server = MockServer::start().await;
        mount_universe_lookup(&mock_server).await;

        let client = create_test_client(&mock_server.uri());
        let universe_id = client.fetch_universe_id().await.unwrap();

        assert_eq!(universe_id, UNIVERSE_ID);
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_api_error_status_is_surfaced() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/universes/v1/places/{}/universe",
                PLACE_ID
            )))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.fetch_universe_id().await;

        match result {
            Err(RobloxError::Api { status, message }) => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("Expected Api error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_empty_data_array_is_invalid_response() {
        let mock_server = MockServer::start().await;
        mount_universe_lookup(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1/games"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.fetch_snapshot().await;

        // One attempt, no retries: surfaced as Unavailable wrapping the cause.
        match result {
            Err(RobloxError::Unavailable { message, .. }) => {
                assert!(message.contains("Invalid response"), "was: {}", message);
            }
            other => panic!("Expected Unavailable error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/universes/v1/places/{}/universe",
                PLACE_ID
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let client = create_test_client(&mock_server.uri());
        let result = client.fetch_universe_id().await;

        assert!(matches!(result, Err(RobloxError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_retry_then_exhaustion() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!(
                "/universes/v1/places/{}/universe",
                PLACE_ID
            )))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3) // initial attempt + 2 retries
            .mount(&mock_server)
            .await;

        let config = RobloxConfig {
            apis_base_url: mock_server.uri(),
            games_base_url: mock_server.uri(),
        };
        let request_config = RequestConfig {
            timeout_ms: 5000,
            max_retries: 2,
            retry_delay_ms: 10,
        };
        let client = RobloxClient::new(PLACE_ID, &config, request_config).unwrap();

        let result = client.fetch_snapshot().await;

        match result {
            Err(RobloxError::Unavailable { retries, .. }) => assert_eq!(retries, 3),
            other => panic!("Expected Unavailable error, got {:?}", other.err()),
        }
    }
}
