use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::types::Identity;
use crate::types::LedgerError;

use super::AppState;
use super::AppStore;

/// The caller, as identified by the bearer token of the request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[axum::async_trait]
impl<S: AppStore> FromRequestParts<AppState<S>> for AuthUser {
    type Rejection = LedgerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
        state.tokens().authorize(header).map(AuthUser)
    }
}
