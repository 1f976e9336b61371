// src/handlers/playlists.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    models::playlist::CreatePlaylistRequest,
    store::{NewPlaylist, Store},
    utils::{auth::CurrentUser, validated_json::ValidatedJson},
};

/// Creates a playlist owned by the authenticated user. Ratings start at zero.
pub async fn create_playlist(
    State(store): State<Arc<dyn Store>>,
    Extension(CurrentUser(owner)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<CreatePlaylistRequest>,
) -> Result<impl IntoResponse, AppError> {
    let playlist = store
        .insert_playlist(NewPlaylist {
            owner_id: owner.id,
            name: payload.name,
            is_public: payload.is_public,
        })
        .await
        .map_err(|e| {
            tracing::error!("Failed to create playlist: {:?}", e);
            AppError::from(e)
        })?;

    Ok((StatusCode::CREATED, Json(playlist)))
}
