// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::token::{AccessToken, PublicToken};

/// Represents the 'users' table in the database.
///
/// Never serialized directly; responses go through [`UserView`] or
/// [`UserSummary`] so the password hash and email stay server-side.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,

    /// Unique username.
    pub username: String,

    pub email: String,

    /// Argon2 password hash.
    pub password_hash: String,

    pub public_token: PublicToken,

    pub access_token: AccessToken,

    /// Favourite playlist ids. Kept duplicate-free by the store.
    pub favourite_playlists: Vec<Uuid>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn has_favourite(&self, playlist_id: Uuid) -> bool {
        self.favourite_playlists.contains(&playlist_id)
    }
}

/// Full view of a user, only ever returned to the user itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub username: String,
    #[serde(rename = "token")]
    pub public_token: PublicToken,
    pub access_token: AccessToken,
    #[serde(rename = "userId")]
    pub id: Uuid,
    pub favourite_playlists: Vec<Uuid>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            public_token: user.public_token.clone(),
            access_token: user.access_token.clone(),
            id: user.id,
            favourite_playlists: user.favourite_playlists.clone(),
        }
    }
}

/// Listing entry for `GET /users`. No access token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub username: String,
    #[serde(rename = "token")]
    pub public_token: PublicToken,
    #[serde(rename = "userId")]
    pub id: Uuid,
    pub favourite_playlists: Vec<Uuid>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            public_token: user.public_token.clone(),
            id: user.id,
            favourite_playlists: user.favourite_playlists.clone(),
        }
    }
}

/// DTO for creating a new user (Registration).
/// Missing fields deserialize as empty strings so they fail validation with a 400.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Invalid input."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Invalid input."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, max = 254, message = "Invalid input."))]
    pub email: String,
}

/// DTO for changing username and/or password of the authenticated user.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub current_username: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Username must not be empty."))]
    pub new_username: Option<String>,
    #[validate(length(min = 1, max = 128, message = "Password must not be empty."))]
    pub new_password: Option<String>,
}

/// Explicit favourites intent. When absent the request is a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavouriteAction {
    Add,
    Remove,
}

impl FavouriteAction {
    /// How the playlist rating moves when this action changes membership.
    pub fn rating_delta(self) -> i32 {
        match self {
            FavouriteAction::Add => 1,
            FavouriteAction::Remove => -1,
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavouriteIntent {
    /// Flip membership: add when absent and a rating was supplied, remove otherwise.
    Toggle { rating_supplied: bool },
    /// Force membership to a given state. Repeating it is harmless.
    Set(FavouriteAction),
}

impl FavouriteIntent {
    /// Picks the action given the membership observed inside the write.
    pub fn resolve(self, currently_favourite: bool) -> FavouriteAction {
        match self {
            FavouriteIntent::Toggle { rating_supplied } => {
                if !currently_favourite && rating_supplied {
                    FavouriteAction::Add
                } else {
                    FavouriteAction::Remove
                }
            }
            FavouriteIntent::Set(action) => action,
        }
    }
}

/// DTO for `PUT /users/{token}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FavouriteRequest {
    pub playlist_id: Uuid,
    /// Any JSON value; only its truthiness matters for toggles.
    #[serde(default)]
    pub rating: Option<serde_json::Value>,
    #[serde(default)]
    pub action: Option<FavouriteAction>,
}

impl FavouriteRequest {
    /// Mirrors how loosely-typed clients treat the `rating` field:
    /// null, false, 0, "" and a missing field are all "no rating".
    pub fn rating_supplied(&self) -> bool {
        use serde_json::Value;
        match &self.rating {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0 && !v.is_nan()),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(rating: serde_json::Value) -> FavouriteRequest {
        serde_json::from_value(json!({
            "playlistId": Uuid::new_v4(),
            "rating": rating,
        }))
        .unwrap()
    }

    #[test]
    fn rating_truthiness() {
        assert!(request(json!(1)).rating_supplied());
        assert!(request(json!(7)).rating_supplied());
        assert!(request(json!("5")).rating_supplied());
        assert!(!request(json!(0)).rating_supplied());
        assert!(!request(json!(null)).rating_supplied());
        assert!(!request(json!("")).rating_supplied());
        assert!(!request(json!(false)).rating_supplied());
    }

    #[test]
    fn missing_rating_is_not_supplied() {
        let req: FavouriteRequest =
            serde_json::from_value(json!({ "playlistId": Uuid::new_v4() })).unwrap();
        assert!(!req.rating_supplied());
        assert!(req.action.is_none());
    }

    #[test]
    fn toggle_resolves_against_observed_membership() {
        let toggle = FavouriteIntent::Toggle {
            rating_supplied: true,
        };
        assert_eq!(toggle.resolve(false), FavouriteAction::Add);
        assert_eq!(toggle.resolve(true), FavouriteAction::Remove);

        let no_rating = FavouriteIntent::Toggle {
            rating_supplied: false,
        };
        assert_eq!(no_rating.resolve(false), FavouriteAction::Remove);

        let set = FavouriteIntent::Set(FavouriteAction::Add);
        assert_eq!(set.resolve(true), FavouriteAction::Add);
    }

    #[test]
    fn user_view_uses_wire_names_and_hides_secrets() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$hash".into(),
            public_token: PublicToken::new("pub"),
            access_token: AccessToken::new("acc"),
            favourite_playlists: vec![],
            created_at: chrono::Utc::now(),
        };

        let view = serde_json::to_value(UserView::from(&user)).unwrap();
        assert_eq!(view["token"], "pub");
        assert_eq!(view["accessToken"], "acc");
        assert_eq!(view["userId"], json!(user.id));
        assert!(view.get("passwordHash").is_none());
        assert!(view.get("email").is_none());

        let summary = serde_json::to_value(UserSummary::from(&user)).unwrap();
        assert!(summary.get("accessToken").is_none());
    }
}
