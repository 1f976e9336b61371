// src/handlers/users.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        token::PublicToken,
        user::{CreateUserRequest, FavouriteRequest, UpdateAccountRequest, UserSummary, UserView},
    },
    services::{FavouriteIntent, FavouritesSynchronizer, IdentityService, VisibilityResolver},
    utils::{
        auth::{CurrentUser, Requester},
        validated_json::ValidatedJson,
    },
};

/// Registers a new user.
///
/// Returns 201 Created with the full user view (the caller now owns both tokens)
/// and an empty playlist list.
pub async fn register(
    State(identity): State<IdentityService>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = identity
        .issue_credentials(&payload.username, &payload.password, &payload.email)
        .await?;

    let location = format!("/api/v1/users/{}", user.public_token);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(json!({ "user": UserView::from(&user), "playlist": [] })),
    ))
}

/// Lists every user. Requires a bearer token; access tokens are never included.
pub async fn list_users(
    State(identity): State<IdentityService>,
    Extension(_caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let users = identity.list_users().await?;

    Ok(Json(
        users.iter().map(UserSummary::from).collect::<Vec<_>>(),
    ))
}

/// Changes the username and/or password of the authenticated user.
///
/// Both changes land in one write; a rejected request changes neither.
pub async fn update_account(
    State(identity): State<IdentityService>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    ValidatedJson(payload): ValidatedJson<UpdateAccountRequest>,
) -> Result<Response, AppError> {
    let change = identity
        .update_account(
            &caller.access_token,
            payload.new_username.as_deref(),
            payload.new_password.as_deref(),
        )
        .await?;

    if change.username_changed {
        return Ok(Json(UserView::from(&change.user)).into_response());
    }

    if change.password_changed {
        return Ok(Json(json!({
            "message": "Your password has been changed successfully."
        }))
        .into_response());
    }

    Ok(Json(json!({ "message": "New username is same as the current username." })).into_response())
}

/// Shows a user's profile and playlists.
/// The owner (matching bearer token) sees everything; everyone else sees public playlists only.
pub async fn get_profile(
    State(visibility): State<VisibilityResolver>,
    Extension(Requester(requester)): Extension<Requester>,
    Path(token): Path<PublicToken>,
) -> Result<impl IntoResponse, AppError> {
    let view = visibility
        .list_playlists_for(&token, requester.as_ref().map(|u| &u.access_token))
        .await?;

    Ok(Json(view))
}

/// Lists the playlists a user has favourited. The owner (matching bearer
/// token) sees all of them; everyone else sees the public ones.
pub async fn get_favourites(
    State(visibility): State<VisibilityResolver>,
    Extension(Requester(requester)): Extension<Requester>,
    Path(token): Path<PublicToken>,
) -> Result<impl IntoResponse, AppError> {
    let view = visibility
        .list_favourites_for(&token, requester.as_ref().map(|u| &u.access_token))
        .await?;

    Ok(Json(view))
}

/// Basic-credential login addressed by public token. Same response shapes as
/// [`get_profile`], with the authenticated user as the requester.
pub async fn login(
    State(visibility): State<VisibilityResolver>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<PublicToken>,
) -> Result<impl IntoResponse, AppError> {
    let view = visibility
        .list_playlists_for(&token, Some(&user.access_token))
        .await?;

    Ok(Json(view))
}

/// Adds or removes a playlist from the addressed user's favourites and
/// updates the playlist rating accordingly.
///
/// Without `action` the request toggles; with `action: "add" | "remove"` it
/// sets membership and can be repeated safely.
pub async fn update_favourites(
    State(favourites): State<FavouritesSynchronizer>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(token): Path<PublicToken>,
    ValidatedJson(payload): ValidatedJson<FavouriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let intent = match payload.action {
        Some(action) => FavouriteIntent::Set(action),
        None => FavouriteIntent::Toggle {
            rating_supplied: payload.rating_supplied(),
        },
    };

    let outcome = favourites
        .toggle_favourite(&token, payload.playlist_id, intent)
        .await?;

    // Only the owner may see their own access token and favourites.
    let user = if outcome.user.access_token == caller.access_token {
        json!(UserView::from(&outcome.user))
    } else {
        json!({ "username": outcome.user.username, "userId": outcome.user.id })
    };

    Ok(Json(json!({ "user": user, "playlist": outcome.playlist })))
}
