// src/models/playlist.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'playlists' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Uuid,

    #[serde(rename = "userId")]
    pub owner_id: Uuid,

    pub name: String,

    pub is_public: bool,

    /// Number of users that have this playlist among their favourites.
    /// Never negative.
    pub rating: i32,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new playlist.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 chars"
    ))]
    pub name: String,

    #[serde(default)]
    pub is_public: bool,
}
