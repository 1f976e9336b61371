// src/utils/auth.rs

use axum::{
    extract::{Query, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use crate::{
    error::AppError,
    models::{token::AccessToken, user::User},
    services::identity::IdentityService,
};

/// The user proven by the request's credentials.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Whoever is asking, if they presented a valid bearer token.
#[derive(Debug, Clone)]
pub struct Requester(pub Option<User>);

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

/// Reads the bearer token from `Authorization: Bearer <token>`, falling back
/// to the `access_token` query parameter.
fn bearer_token(req: &Request) -> Option<AccessToken> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = from_header {
        return Some(AccessToken::new(token));
    }

    Query::<TokenQuery>::try_from_uri(req.uri())
        .ok()
        .and_then(|Query(query)| query.access_token)
        .filter(|token| !token.is_empty())
        .map(AccessToken::new)
}

/// Decodes `Authorization: Basic <base64(username:password)>`.
fn basic_credentials(req: &Request) -> Option<(String, String)> {
    let encoded = req
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Basic ")?;

    let decoded = String::from_utf8(STANDARD.decode(encoded.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some((username.to_string(), password.to_string()))
}

/// Axum Middleware: Bearer authentication.
///
/// Resolves the access token to a user and injects [`CurrentUser`] into the
/// request extensions. Missing or unknown tokens are rejected with 401.
pub async fn auth_middleware(
    State(identity): State<IdentityService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let user = identity.resolve_bearer(&token).await?.ok_or_else(|| {
        tracing::debug!("Rejected unknown bearer token");
        AppError::AuthError("Invalid bearer token".to_string())
    })?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Axum Middleware: optional bearer authentication.
///
/// Never rejects; injects [`Requester`] holding the resolved user, or `None`
/// for anonymous callers and unknown tokens.
pub async fn optional_auth_middleware(
    State(identity): State<IdentityService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match bearer_token(&req) {
        Some(token) => identity.resolve_bearer(&token).await?,
        None => None,
    };

    req.extensions_mut().insert(Requester(user));
    Ok(next.run(req).await)
}

/// Axum Middleware: HTTP Basic authentication against username and password.
pub async fn basic_auth_middleware(
    State(identity): State<IdentityService>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (username, password) = basic_credentials(&req)
        .ok_or_else(|| AppError::AuthError("Missing basic credentials".to_string()))?;

    let user = identity
        .authenticate_basic(&username, &password)
        .await?
        .ok_or_else(|| {
            tracing::debug!("Basic authentication failed for {}", username);
            AppError::AuthError("Invalid username or password".to_string())
        })?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
