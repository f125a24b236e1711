use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Authenticated user context extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.id,
            email: claims.email,
        }
    }
}

/// Why a presented token was not accepted.
#[derive(Clone, Debug)]
struct AuthFailure(String);

/// Decode the session token when one is presented. Routes decide whether
/// authentication is required by extracting `AuthUser` or
/// `OptionalAuthUser`.
pub async fn jwt_auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match extract_jwt_from_headers(request.headers()) {
        Ok(None) => {}
        Ok(Some(token)) => match auth::validate_jwt(&token, &state.config.security) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(e) => {
                debug!("Rejected session token: {}", e);
                request.extensions_mut().insert(AuthFailure(e.to_string()));
            }
        },
        Err(msg) => {
            request.extensions_mut().insert(AuthFailure(msg));
        }
    }

    next.run(request).await
}

/// Extract JWT token from Authorization header. Accepts the `JWT` scheme
/// issued at login as well as `Bearer`.
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<Option<String>, String> {
    let Some(auth_header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    let token = auth_str
        .strip_prefix("JWT ")
        .or_else(|| auth_str.strip_prefix("Bearer "))
        .ok_or_else(|| "Authorization header must use the JWT or Bearer scheme".to_string())?;

    if token.trim().is_empty() {
        return Err("Empty JWT token".to_string());
    }
    Ok(Some(token.trim().to_string()))
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        let message = match parts.extensions.get::<AuthFailure>() {
            Some(AuthFailure(reason)) => reason.clone(),
            None => "Missing Authorization header".to_string(),
        };
        Err(ApiError::unauthorized(message))
    }
}

/// The caller, when a valid token was presented.
#[derive(Clone, Debug)]
pub struct OptionalAuthUser(pub Option<AuthUser>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OptionalAuthUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(parts.extensions.get::<AuthUser>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_accepts_jwt_and_bearer_schemes() {
        assert_eq!(extract_jwt_from_headers(&headers("JWT abc")).unwrap().as_deref(), Some("abc"));
        assert_eq!(extract_jwt_from_headers(&headers("Bearer abc")).unwrap().as_deref(), Some("abc"));
        assert_eq!(extract_jwt_from_headers(&HeaderMap::new()).unwrap(), None);
        assert!(extract_jwt_from_headers(&headers("Basic abc")).is_err());
        assert!(extract_jwt_from_headers(&headers("JWT  ")).is_err());
    }
}
