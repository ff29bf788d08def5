use serde::Deserialize;

/// Response from the universe lookup endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UniverseResponse {
    #[serde(rename = "universeId")]
    pub universe_id: i64,
}

/// Envelope shared by the game-details and votes endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    pub data: Vec<T>,
}

/// One entry from the game-details endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GameDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub visits: i64,
    #[serde(default)]
    pub playing: i64,
    #[serde(default)]
    pub favorites: i64,
}

/// One entry from the votes endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GameVotes {
    #[serde(rename = "upVotes", default)]
    pub up_votes: i64,
    #[serde(rename = "downVotes", default)]
    pub down_votes: i64,
}
