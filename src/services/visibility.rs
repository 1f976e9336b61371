// src/services/visibility.rs

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        playlist::Playlist,
        token::{AccessToken, PublicToken},
        user::UserView,
    },
    store::Store,
};

/// What a requester gets to see of another user's profile.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PlaylistsView {
    /// The requester holds the target's access token: everything.
    Owner {
        user: UserView,
        playlist: Vec<Playlist>,
    },
    /// Anyone else: name, id and public playlists only.
    Public {
        username: String,
        #[serde(rename = "userId")]
        user_id: Uuid,
        playlist: Vec<Playlist>,
    },
}

impl PlaylistsView {
    pub fn is_owner(&self) -> bool {
        matches!(self, PlaylistsView::Owner { .. })
    }

    pub fn playlists(&self) -> &[Playlist] {
        match self {
            PlaylistsView::Owner { playlist, .. } | PlaylistsView::Public { playlist, .. } => {
                playlist
            }
        }
    }
}

/// A user's favourite playlists as records, filtered for the requester.
#[derive(Debug, Serialize)]
pub struct FavouritesView {
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub playlist: Vec<Playlist>,
}

#[derive(Clone)]
pub struct VisibilityResolver {
    store: Arc<dyn Store>,
}

impl VisibilityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Resolves the profile addressed by `target` as seen by `requester`.
    ///
    /// Ownership is decided solely by possession of the target's access token;
    /// the public token only addresses the profile.
    pub async fn list_playlists_for(
        &self,
        target: &PublicToken,
        requester: Option<&AccessToken>,
    ) -> Result<PlaylistsView, AppError> {
        let user = self
            .store
            .find_user_by_public_token(target)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if requester.is_some_and(|token| token == &user.access_token) {
            let playlist = self.store.list_playlists_by_owner(user.id, false).await?;
            Ok(PlaylistsView::Owner {
                user: UserView::from(&user),
                playlist,
            })
        } else {
            let playlist = self.store.list_playlists_by_owner(user.id, true).await?;
            Ok(PlaylistsView::Public {
                username: user.username,
                user_id: user.id,
                playlist,
            })
        }
    }

    /// Resolves the favourites of the user addressed by `target` into playlist
    /// records, in favouriting order. Ids whose playlist no longer exists are
    /// skipped. Anyone but the owner only gets the public ones.
    pub async fn list_favourites_for(
        &self,
        target: &PublicToken,
        requester: Option<&AccessToken>,
    ) -> Result<FavouritesView, AppError> {
        let user = self
            .store
            .find_user_by_public_token(target)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let is_owner = requester.is_some_and(|token| token == &user.access_token);

        let mut playlist = self.store.find_playlists(&user.favourite_playlists).await?;
        if !is_owner {
            playlist.retain(|p| p.is_public);
        }

        Ok(FavouritesView {
            username: user.username,
            user_id: user.id,
            playlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::User,
        store::{MemoryStore, NewPlaylist, NewUser},
    };

    async fn seed(store: &MemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "hash".to_string(),
                public_token: PublicToken::new(format!("pub-{}", name)),
                access_token: AccessToken::new(format!("acc-{}", name)),
            })
            .await
            .unwrap()
    }

    async fn playlist(store: &MemoryStore, owner: &User, name: &str, is_public: bool) -> Playlist {
        store
            .insert_playlist(NewPlaylist {
                owner_id: owner.id,
                name: name.to_string(),
                is_public,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn owner_sees_everything() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed(&store, "alice").await;
        playlist(&store, &alice, "public", true).await;
        playlist(&store, &alice, "private", false).await;

        let resolver = VisibilityResolver::new(store.clone());
        let view = resolver
            .list_playlists_for(&alice.public_token, Some(&alice.access_token))
            .await
            .unwrap();

        assert!(view.is_owner());
        assert_eq!(view.playlists().len(), 2);
    }

    #[tokio::test]
    async fn others_and_anonymous_see_public_only() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed(&store, "alice").await;
        let bob = seed(&store, "bob").await;
        playlist(&store, &alice, "public", true).await;
        let private = playlist(&store, &alice, "private", false).await;

        let resolver = VisibilityResolver::new(store.clone());
        for requester in [Some(&bob.access_token), None] {
            let view = resolver
                .list_playlists_for(&alice.public_token, requester)
                .await
                .unwrap();

            assert!(!view.is_owner());
            assert_eq!(view.playlists().len(), 1);
            assert!(view.playlists().iter().all(|p| p.id != private.id));

            let json = serde_json::to_value(&view).unwrap();
            assert!(!json.to_string().contains(alice.access_token.as_str()));
            assert!(json.get("favouritePlaylists").is_none());
        }
    }

    #[tokio::test]
    async fn public_token_is_not_an_access_token() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed(&store, "alice").await;

        let resolver = VisibilityResolver::new(store.clone());
        let forged = AccessToken::new(alice.public_token.as_str());
        let view = resolver
            .list_playlists_for(&alice.public_token, Some(&forged))
            .await
            .unwrap();
        assert!(!view.is_owner());
    }

    #[tokio::test]
    async fn favourites_resolve_to_records_filtered_for_requester() {
        let store = Arc::new(MemoryStore::new());
        let alice = seed(&store, "alice").await;
        let bob = seed(&store, "bob").await;
        let open = playlist(&store, &bob, "open", true).await;
        let secret = playlist(&store, &alice, "secret", false).await;
        store.add_favourite(alice.id, secret.id).await.unwrap();
        store.add_favourite(alice.id, open.id).await.unwrap();
        store.add_favourite(alice.id, Uuid::new_v4()).await.unwrap();

        let resolver = VisibilityResolver::new(store.clone());
        let own = resolver
            .list_favourites_for(&alice.public_token, Some(&alice.access_token))
            .await
            .unwrap();
        let ids: Vec<_> = own.playlist.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![secret.id, open.id]);

        for requester in [Some(&bob.access_token), None] {
            let view = resolver
                .list_favourites_for(&alice.public_token, requester)
                .await
                .unwrap();
            let ids: Vec<_> = view.playlist.iter().map(|p| p.id).collect();
            assert_eq!(ids, vec![open.id]);
        }
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let resolver = VisibilityResolver::new(Arc::new(MemoryStore::new()));
        let err = resolver
            .list_playlists_for(&PublicToken::new("missing"), None)
            .await;
        assert!(matches!(err, Err(AppError::NotFound(_))));
    }
}
