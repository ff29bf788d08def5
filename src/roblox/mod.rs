//! Roblox games API client and wire types.

mod client;
mod types;

pub use client::RobloxClient;
pub use types::{GameDetails, GameVotes, UniverseResponse};
