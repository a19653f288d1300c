use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::clients::{Adapters, UserProfile};
use crate::error::ApiErr;

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated caller, resolved from the `Authorization: Bearer <token>`
/// header through the identity provider. Each request re-verifies; there is
/// no local session state.
pub struct AuthUser(pub UserProfile);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Adapters: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let adapters = Adapters::from_ref(state);

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "missing or invalid Authorization header"})),
                )
                    .into_response()
            })?
            .to_string();

        match adapters.identity.verify_token(&token).await {
            Ok(profile) => Ok(AuthUser(profile)),
            Err(e) => Err(ApiErr::from(e).into_response()),
        }
    }
}
