// src/store/mod.rs

//! Persistence port for users and playlists.
//!
//! Most methods are a single atomic operation against one record.
//! [`Store::apply_favourite`] spans a user and a playlist: backends with
//! transactions override it, the rest fall back to [`apply_favourite_in_steps`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    playlist::Playlist,
    token::{AccessToken, PublicToken},
    user::{FavouriteAction, FavouriteIntent, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which unique key a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    PublicToken,
    AccessToken,
}

impl UniqueField {
    pub fn describe(&self) -> &'static str {
        match self {
            UniqueField::Username => "Username",
            UniqueField::PublicToken => "Public token",
            UniqueField::AccessToken => "Access token",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0:?}")]
    UniqueViolation(UniqueField),

    #[error("store backend failure: {0}")]
    Backend(String),

    /// The favourites set changed but the rating update did not go through.
    #[error("rating of playlist {playlist_id} not updated: {reason}")]
    PartialSync { playlist_id: Uuid, reason: String },
}

/// Fields needed to insert a user; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub public_token: PublicToken,
    pub access_token: AccessToken,
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub owner_id: Uuid,
    pub name: String,
    pub is_public: bool,
}

/// Result of a conditional favourites-set update.
#[derive(Debug, Clone)]
pub struct SetUpdate {
    /// The user after the update attempt.
    pub user: User,
    /// False when the set already had the requested membership.
    pub changed: bool,
}

/// Result of [`Store::apply_favourite`].
#[derive(Debug, Clone)]
pub struct FavouriteChange {
    pub user: User,
    pub playlist: Playlist,
    pub action: FavouriteAction,
    /// False when membership was already in the requested state; the rating
    /// is untouched in that case.
    pub changed: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_public_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<User>, StoreError>;

    async fn find_user_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<User>, StoreError>;

    /// Sets whichever of username and password hash are given, in one write,
    /// on the user owning `token`. `None` if there is no such user.
    async fn update_credentials(
        &self,
        token: &AccessToken,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    /// Appends `playlist_id` to the favourites set unless already present.
    /// `None` if the user does not exist.
    async fn add_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError>;

    /// Removes `playlist_id` from the favourites set if present.
    /// `None` if the user does not exist.
    async fn remove_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError>;

    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist, StoreError>;

    async fn find_playlist(&self, id: Uuid) -> Result<Option<Playlist>, StoreError>;

    /// The playlists among `ids` that exist, in the order of `ids`.
    async fn find_playlists(&self, ids: &[Uuid]) -> Result<Vec<Playlist>, StoreError>;

    /// Playlists owned by `owner_id`, oldest first. Private ones are skipped when `public_only`.
    async fn list_playlists_by_owner(
        &self,
        owner_id: Uuid,
        public_only: bool,
    ) -> Result<Vec<Playlist>, StoreError>;

    /// Adds `delta` to the rating, clamping the result at zero.
    /// `None` if the playlist does not exist.
    async fn adjust_rating(
        &self,
        playlist_id: Uuid,
        delta: i32,
    ) -> Result<Option<Playlist>, StoreError>;

    /// Resolves `intent` against the user's current favourites and applies it
    /// to the favourites set and the playlist rating together. The rating only
    /// moves when membership changed. `None` if the user or playlist is absent.
    async fn apply_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
        intent: FavouriteIntent,
    ) -> Result<Option<FavouriteChange>, StoreError> {
        apply_favourite_in_steps(self, user_id, playlist_id, intent).await
    }
}

/// [`Store::apply_favourite`] for backends without multi-record transactions.
///
/// Runs two single-record updates in a fixed order: favourites set first,
/// rating second. A rating update that fails after the set changed is
/// reported as [`StoreError::PartialSync`].
pub async fn apply_favourite_in_steps<S: Store + ?Sized>(
    store: &S,
    user_id: Uuid,
    playlist_id: Uuid,
    intent: FavouriteIntent,
) -> Result<Option<FavouriteChange>, StoreError> {
    let Some(user) = store.find_user(user_id).await? else {
        return Ok(None);
    };
    let Some(playlist) = store.find_playlist(playlist_id).await? else {
        return Ok(None);
    };

    let action = intent.resolve(user.has_favourite(playlist_id));

    let update = match action {
        FavouriteAction::Add => store.add_favourite(user_id, playlist_id).await?,
        FavouriteAction::Remove => store.remove_favourite(user_id, playlist_id).await?,
    };
    let Some(update) = update else {
        return Ok(None);
    };

    if !update.changed {
        return Ok(Some(FavouriteChange {
            user: update.user,
            playlist,
            action,
            changed: false,
        }));
    }

    let playlist = match store.adjust_rating(playlist_id, action.rating_delta()).await {
        Ok(Some(playlist)) => playlist,
        Ok(None) => {
            return Err(StoreError::PartialSync {
                playlist_id,
                reason: "playlist disappeared before its rating was updated".to_string(),
            });
        }
        Err(e) => {
            return Err(StoreError::PartialSync {
                playlist_id,
                reason: e.to_string(),
            });
        }
    };

    Ok(Some(FavouriteChange {
        user: update.user,
        playlist,
        action,
        changed: true,
    }))
}
