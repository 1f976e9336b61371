// src/store/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{FavouriteChange, NewPlaylist, NewUser, SetUpdate, Store, StoreError, UniqueField};
use crate::models::{
    playlist::Playlist,
    token::{AccessToken, PublicToken},
    user::{FavouriteAction, FavouriteIntent, User},
};

/// In-process store used when no database is configured, and by the tests.
///
/// Every operation runs under a single lock, so each one, including
/// [`Store::apply_favourite`] across both tables, is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    playlists: Vec<Playlist>,
}

impl Tables {
    fn user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    fn user_by_access_token_mut(&mut self, token: &AccessToken) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.access_token == token)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        for existing in &tables.users {
            if existing.username == new.username {
                return Err(StoreError::UniqueViolation(UniqueField::Username));
            }
            if existing.public_token == new.public_token {
                return Err(StoreError::UniqueViolation(UniqueField::PublicToken));
            }
            if existing.access_token == new.access_token {
                return Err(StoreError::UniqueViolation(UniqueField::AccessToken));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            public_token: new.public_token,
            access_token: new.access_token,
            favourite_playlists: Vec::new(),
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_public_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| &u.public_token == token)
            .cloned())
    }

    async fn find_user_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| &u.access_token == token)
            .cloned())
    }

    async fn update_credentials(
        &self,
        token: &AccessToken,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;

        let taken = username.is_some_and(|name| {
            tables
                .users
                .iter()
                .any(|u| u.username == name && &u.access_token != token)
        });

        let Some(user) = tables.user_by_access_token_mut(token) else {
            return Ok(None);
        };
        if taken {
            return Err(StoreError::UniqueViolation(UniqueField::Username));
        }
        if let Some(name) = username {
            user.username = name.to_string();
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash.to_string();
        }

        Ok(Some(user.clone()))
    }

    async fn add_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.user_mut(user_id).map(|user| {
            let changed = !user.has_favourite(playlist_id);
            if changed {
                user.favourite_playlists.push(playlist_id);
            }
            SetUpdate {
                user: user.clone(),
                changed,
            }
        }))
    }

    async fn remove_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.user_mut(user_id).map(|user| {
            let before = user.favourite_playlists.len();
            user.favourite_playlists.retain(|id| *id != playlist_id);
            SetUpdate {
                changed: user.favourite_playlists.len() != before,
                user: user.clone(),
            }
        }))
    }

    async fn insert_playlist(&self, new: NewPlaylist) -> Result<Playlist, StoreError> {
        let playlist = Playlist {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            name: new.name,
            is_public: new.is_public,
            rating: 0,
            created_at: Utc::now(),
        };
        self.tables.write().await.playlists.push(playlist.clone());

        Ok(playlist)
    }

    async fn find_playlist(&self, id: Uuid) -> Result<Option<Playlist>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.playlists.iter().find(|p| p.id == id).cloned())
    }

    async fn find_playlists(&self, ids: &[Uuid]) -> Result<Vec<Playlist>, StoreError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.playlists.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    async fn list_playlists_by_owner(
        &self,
        owner_id: Uuid,
        public_only: bool,
    ) -> Result<Vec<Playlist>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .playlists
            .iter()
            .filter(|p| p.owner_id == owner_id && (p.is_public || !public_only))
            .cloned()
            .collect())
    }

    async fn adjust_rating(
        &self,
        playlist_id: Uuid,
        delta: i32,
    ) -> Result<Option<Playlist>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .map(|playlist| {
                playlist.rating = playlist.rating.saturating_add(delta).max(0);
                playlist.clone()
            }))
    }

    async fn apply_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
        intent: FavouriteIntent,
    ) -> Result<Option<FavouriteChange>, StoreError> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(user) = tables.users.iter_mut().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        let Some(playlist) = tables.playlists.iter_mut().find(|p| p.id == playlist_id) else {
            return Ok(None);
        };

        let currently_favourite = user.has_favourite(playlist_id);
        let action = intent.resolve(currently_favourite);
        let changed = match action {
            FavouriteAction::Add => !currently_favourite,
            FavouriteAction::Remove => currently_favourite,
        };

        if changed {
            match action {
                FavouriteAction::Add => user.favourite_playlists.push(playlist_id),
                FavouriteAction::Remove => user.favourite_playlists.retain(|id| *id != playlist_id),
            }
            playlist.rating = playlist
                .rating
                .saturating_add(action.rating_delta())
                .max(0);
        }

        Ok(Some(FavouriteChange {
            user: user.clone(),
            playlist: playlist.clone(),
            action,
            changed,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            public_token: PublicToken::new(format!("pub-{}", name)),
            access_token: AccessToken::new(format!("acc-{}", name)),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let mut dup = new_user("bob");
        dup.username = "alice".to_string();
        let err = store.insert_user(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::Username)));
    }

    #[tokio::test]
    async fn rejects_duplicate_access_token() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();

        let mut dup = new_user("bob");
        dup.access_token = AccessToken::new("acc-alice");
        let err = store.insert_user(dup).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::AccessToken)));
    }

    #[tokio::test]
    async fn favourites_set_has_no_duplicates() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice")).await.unwrap();
        let playlist = Uuid::new_v4();

        let first = store.add_favourite(user.id, playlist).await.unwrap().unwrap();
        let second = store.add_favourite(user.id, playlist).await.unwrap().unwrap();
        assert!(first.changed);
        assert!(!second.changed);
        assert_eq!(second.user.favourite_playlists, vec![playlist]);

        let removed = store.remove_favourite(user.id, playlist).await.unwrap().unwrap();
        let again = store.remove_favourite(user.id, playlist).await.unwrap().unwrap();
        assert!(removed.changed);
        assert!(!again.changed);
        assert!(again.user.favourite_playlists.is_empty());
    }

    #[tokio::test]
    async fn rating_never_goes_negative() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice")).await.unwrap();
        let playlist = store
            .insert_playlist(NewPlaylist {
                owner_id: user.id,
                name: "mix".to_string(),
                is_public: true,
            })
            .await
            .unwrap();

        let updated = store.adjust_rating(playlist.id, -1).await.unwrap().unwrap();
        assert_eq!(updated.rating, 0);
        let updated = store.adjust_rating(playlist.id, 1).await.unwrap().unwrap();
        assert_eq!(updated.rating, 1);
    }

    #[tokio::test]
    async fn unknown_records_yield_none() {
        let store = MemoryStore::new();
        assert!(store.add_favourite(Uuid::new_v4(), Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.adjust_rating(Uuid::new_v4(), 1).await.unwrap().is_none());
        assert!(
            store
                .update_credentials(&AccessToken::new("nope"), Some("x"), None)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .apply_favourite(
                    Uuid::new_v4(),
                    Uuid::new_v4(),
                    FavouriteIntent::Set(FavouriteAction::Add)
                )
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn apply_favourite_moves_set_and_rating_together() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice")).await.unwrap();
        let playlist = store
            .insert_playlist(NewPlaylist {
                owner_id: user.id,
                name: "mix".to_string(),
                is_public: true,
            })
            .await
            .unwrap();
        let toggle = FavouriteIntent::Toggle {
            rating_supplied: true,
        };

        let added = store
            .apply_favourite(user.id, playlist.id, toggle)
            .await
            .unwrap()
            .unwrap();
        assert!(added.changed);
        assert_eq!(added.action, FavouriteAction::Add);
        assert_eq!(added.user.favourite_playlists, vec![playlist.id]);
        assert_eq!(added.playlist.rating, 1);

        let removed = store
            .apply_favourite(user.id, playlist.id, toggle)
            .await
            .unwrap()
            .unwrap();
        assert!(removed.changed);
        assert_eq!(removed.action, FavouriteAction::Remove);
        assert!(removed.user.favourite_playlists.is_empty());
        assert_eq!(removed.playlist.rating, 0);
    }

    #[tokio::test]
    async fn credentials_update_in_one_write() {
        let store = MemoryStore::new();
        store.insert_user(new_user("alice")).await.unwrap();
        store.insert_user(new_user("bob")).await.unwrap();
        let token = AccessToken::new("acc-alice");

        let err = store
            .update_credentials(&token, Some("bob"), Some("new-hash"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(UniqueField::Username)));
        let alice = store.find_user_by_access_token(&token).await.unwrap().unwrap();
        assert_eq!(alice.password_hash, "hash");

        let updated = store
            .update_credentials(&token, Some("alicia"), Some("new-hash"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.password_hash, "new-hash");
    }

    #[tokio::test]
    async fn find_playlists_keeps_requested_order_and_skips_missing() {
        let store = MemoryStore::new();
        let user = store.insert_user(new_user("alice")).await.unwrap();
        let mut ids = Vec::new();
        for name in ["one", "two"] {
            let playlist = store
                .insert_playlist(NewPlaylist {
                    owner_id: user.id,
                    name: name.to_string(),
                    is_public: true,
                })
                .await
                .unwrap();
            ids.push(playlist.id);
        }

        let found = store
            .find_playlists(&[ids[1], Uuid::new_v4(), ids[0]])
            .await
            .unwrap();
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["two", "one"]);
    }
}
