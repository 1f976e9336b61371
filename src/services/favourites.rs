// src/services/favourites.rs

//! Keeps a user's favourite playlists and each playlist's rating in lockstep.
//!
//! The membership change and the rating change go through a single
//! [`Store::apply_favourite`] call, which the backend runs atomically. Only a
//! backend without multi-record transactions can report a partial sync, and
//! that is never retried here since repeating a toggle is not idempotent.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{playlist::Playlist, token::PublicToken, user::FavouriteAction, user::User},
    store::Store,
};

pub use crate::models::user::FavouriteIntent;

#[derive(Debug, Clone)]
pub struct FavouriteOutcome {
    pub user: User,
    pub playlist: Playlist,
    pub action: FavouriteAction,
    /// False when membership was already in the requested state.
    pub changed: bool,
}

#[derive(Clone)]
pub struct FavouritesSynchronizer {
    store: Arc<dyn Store>,
}

impl FavouritesSynchronizer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn toggle_favourite(
        &self,
        target: &PublicToken,
        playlist_id: Uuid,
        intent: FavouriteIntent,
    ) -> Result<FavouriteOutcome, AppError> {
        let user = self
            .store
            .find_user_by_public_token(target)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        // Checked up front so a missing playlist gets its own message.
        if self.store.find_playlist(playlist_id).await?.is_none() {
            return Err(AppError::NotFound("Playlist not found".to_string()));
        }

        let change = self
            .store
            .apply_favourite(user.id, playlist_id, intent)
            .await?
            .ok_or_else(|| AppError::NotFound("User or playlist no longer exists".to_string()))?;

        if change.changed {
            tracing::info!(
                user_id = %user.id,
                %playlist_id,
                action = ?change.action,
                rating = change.playlist.rating,
                "Favourites synchronized"
            );
        } else {
            // Membership already matched, so the rating stayed as it was.
            tracing::debug!(
                user_id = %user.id,
                %playlist_id,
                action = ?change.action,
                "Favourites unchanged"
            );
        }

        Ok(FavouriteOutcome {
            user: change.user,
            playlist: change.playlist,
            action: change.action,
            changed: change.changed,
        })
    }
}
