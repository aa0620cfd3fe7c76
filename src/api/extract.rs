use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use uuid::Uuid;

use crate::{app::AppState, store::UserDao};

use super::error::ApiError;

pub(crate) const LOGIN_PATH: &str = "/auth/login";

/// Caller resolved from a `Authorization: Bearer <token>` header.
///
/// Requests without a live session are redirected to the login route.
#[derive(Debug, Clone)]
pub(crate) struct AuthenticatedUser {
    pub(crate) user_id: i64,
    pub(crate) email: String,
}

/// Session token carried by the request, if it is well formed.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Uuid::parse_str(token.trim()).ok()
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(user_id) = bearer_token(&parts.headers).and_then(|token| state.sessions().resolve(token))
        else {
            return Err(Redirect::to(LOGIN_PATH).into_response());
        };

        match state.store().find_user_by_id(user_id).await {
            Ok(Some(user)) => Ok(Self {
                user_id: user.user_id,
                email: user.email,
            }),
            Ok(None) => Err(Redirect::to(LOGIN_PATH).into_response()),
            Err(error) => Err(ApiError::Internal(error).into_response()),
        }
    }
}
