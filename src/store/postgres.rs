// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{FavouriteChange, NewPlaylist, NewUser, SetUpdate, Store, StoreError, UniqueField};
use crate::models::{
    playlist::Playlist,
    token::{AccessToken, PublicToken},
    user::{FavouriteAction, FavouriteIntent, User},
};

/// PostgreSQL-backed store. Favourites live in a `UUID[]` column and are only
/// ever changed with `array_append` / `array_remove` guarded by `ANY`, so two
/// concurrent toggles can never overwrite each other's array.
///
/// [`Store::apply_favourite`] runs the set change and the rating change in one
/// transaction with the user row locked.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps Postgres unique violations (code 23505) onto the column they hit.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = match db_err.constraint() {
                    Some("users_public_token_key") => UniqueField::PublicToken,
                    Some("users_access_token_key") => UniqueField::AccessToken,
                    _ => UniqueField::Username,
                };
                return StoreError::UniqueViolation(field);
            }
        }
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, public_token, access_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, public_token, access_token,
                      favourite_playlists, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.public_token)
        .bind(&user.access_token)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_public_token(
        &self,
        token: &PublicToken,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            WHERE public_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_access_token(
        &self,
        token: &AccessToken,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            WHERE access_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_credentials(
        &self,
        token: &AccessToken,
        username: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                password_hash = COALESCE($3, password_hash)
            WHERE access_token = $1
            RETURNING id, username, email, password_hash, public_token, access_token,
                      favourite_playlists, created_at
            "#,
        )
        .bind(token)
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn add_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET favourite_playlists = array_append(favourite_playlists, $2)
            WHERE id = $1 AND NOT ($2 = ANY(favourite_playlists))
            RETURNING id, username, email, password_hash, public_token, access_token,
                      favourite_playlists, created_at
            "#,
        )
        .bind(user_id)
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(user) => Ok(Some(SetUpdate {
                user,
                changed: true,
            })),
            // Either the user is gone or the playlist was already there.
            None => Ok(self.find_user(user_id).await?.map(|user| SetUpdate {
                user,
                changed: false,
            })),
        }
    }

    async fn remove_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<SetUpdate>, StoreError> {
        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET favourite_playlists = array_remove(favourite_playlists, $2)
            WHERE id = $1 AND $2 = ANY(favourite_playlists)
            RETURNING id, username, email, password_hash, public_token, access_token,
                      favourite_playlists, created_at
            "#,
        )
        .bind(user_id)
        .bind(playlist_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(user) => Ok(Some(SetUpdate {
                user,
                changed: true,
            })),
            None => Ok(self.find_user(user_id).await?.map(|user| SetUpdate {
                user,
                changed: false,
            })),
        }
    }

    async fn insert_playlist(&self, playlist: NewPlaylist) -> Result<Playlist, StoreError> {
        let playlist = sqlx::query_as::<_, Playlist>(
            r#"
            INSERT INTO playlists (id, owner_id, name, is_public)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, name, is_public, rating, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(playlist.owner_id)
        .bind(&playlist.name)
        .bind(playlist.is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(playlist)
    }

    async fn find_playlist(&self, id: Uuid) -> Result<Option<Playlist>, StoreError> {
        let playlist = sqlx::query_as::<_, Playlist>(
            "SELECT id, owner_id, name, is_public, rating, created_at FROM playlists WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(playlist)
    }

    async fn find_playlists(&self, ids: &[Uuid]) -> Result<Vec<Playlist>, StoreError> {
        let found = sqlx::query_as::<_, Playlist>(
            r#"
            SELECT id, owner_id, name, is_public, rating, created_at
            FROM playlists
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|p| p.id == *id).cloned())
            .collect())
    }

    async fn list_playlists_by_owner(
        &self,
        owner_id: Uuid,
        public_only: bool,
    ) -> Result<Vec<Playlist>, StoreError> {
        let playlists = sqlx::query_as::<_, Playlist>(
            r#"
            SELECT id, owner_id, name, is_public, rating, created_at
            FROM playlists
            WHERE owner_id = $1 AND (is_public OR NOT $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .bind(public_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(playlists)
    }

    async fn adjust_rating(
        &self,
        playlist_id: Uuid,
        delta: i32,
    ) -> Result<Option<Playlist>, StoreError> {
        let playlist = sqlx::query_as::<_, Playlist>(
            r#"
            UPDATE playlists SET rating = GREATEST(0, rating + $2)
            WHERE id = $1
            RETURNING id, owner_id, name, is_public, rating, created_at
            "#,
        )
        .bind(playlist_id)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        Ok(playlist)
    }

    async fn apply_favourite(
        &self,
        user_id: Uuid,
        playlist_id: Uuid,
        intent: FavouriteIntent,
    ) -> Result<Option<FavouriteChange>, StoreError> {
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        // Row lock so concurrent toggles on one user decide their direction in turn.
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, public_token, access_token,
                   favourite_playlists, created_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user) = user else {
            return Ok(None);
        };

        let playlist = sqlx::query_as::<_, Playlist>(
            "SELECT id, owner_id, name, is_public, rating, created_at FROM playlists WHERE id = $1",
        )
        .bind(playlist_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(playlist) = playlist else {
            return Ok(None);
        };

        let action = intent.resolve(user.has_favourite(playlist_id));

        let set_sql = match action {
            FavouriteAction::Add => {
                r#"
                UPDATE users
                SET favourite_playlists = array_append(favourite_playlists, $2)
                WHERE id = $1 AND NOT ($2 = ANY(favourite_playlists))
                RETURNING id, username, email, password_hash, public_token, access_token,
                          favourite_playlists, created_at
                "#
            }
            FavouriteAction::Remove => {
                r#"
                UPDATE users
                SET favourite_playlists = array_remove(favourite_playlists, $2)
                WHERE id = $1 AND $2 = ANY(favourite_playlists)
                RETURNING id, username, email, password_hash, public_token, access_token,
                          favourite_playlists, created_at
                "#
            }
        };

        let updated = sqlx::query_as::<_, User>(set_sql)
            .bind(user_id)
            .bind(playlist_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            tx.commit().await?;
            return Ok(Some(FavouriteChange {
                user,
                playlist,
                action,
                changed: false,
            }));
        };

        let playlist = sqlx::query_as::<_, Playlist>(
            r#"
            UPDATE playlists SET rating = GREATEST(0, rating + $2)
            WHERE id = $1
            RETURNING id, owner_id, name, is_public, rating, created_at
            "#,
        )
        .bind(playlist_id)
        .bind(action.rating_delta())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(FavouriteChange {
            user: updated,
            playlist,
            action,
            changed: true,
        }))
    }
}
