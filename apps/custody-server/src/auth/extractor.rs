// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated callers.
//!
//! ```rust,ignore
//! async fn handler(AdminOnly(user): AdminOnly) -> impl IntoResponse {
//!     // user is an AuthenticatedUser with role admin or super_admin
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::claims::JwtClaims;
use super::{AuthError, AuthenticatedUser};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Any caller with a valid bearer token.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let user = verify_jwt(token, &state.auth_config)?;
        Ok(Auth(user))
    }
}

/// Caller with a staff role (`admin` or `super_admin`).
///
/// Finer-grained checks (e.g. only `super_admin` may process) happen in the
/// workflow engine so denials land in the audit trail.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.role.is_staff() {
            tracing::warn!(user_id = %user.user_id, role = %user.role, "Non-staff caller on admin route");
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}

fn verify_jwt(token: &str, config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match config.jwt_secret.as_deref() {
        Some(secret) => verify_signed(token, secret, config.audience.as_deref()),
        None => verify_unsigned(token),
    }
}

fn verify_signed(
    token: &str,
    secret: &str,
    audience: Option<&str>,
) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.set_required_spec_claims(&["exp", "sub"]);
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    let token_data = decode::<JwtClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            _ => AuthError::MalformedToken,
        })?;

    Ok(AuthenticatedUser::from_claims(token_data.claims))
}

/// Structure and expiry only; no signature check.
#[cfg(feature = "dev")]
fn verify_unsigned(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<JwtClaims>(token)
        .map_err(|_| AuthError::MalformedToken)?;

    let claims = token_data.claims;
    if claims.exp < chrono::Utc::now().timestamp() - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

#[cfg(not(feature = "dev"))]
fn verify_unsigned(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    tracing::error!("JWT_SECRET is not set; rejecting bearer token");
    Err(AuthError::NotConfigured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::state::testing::{context, token, token_with, TEST_SECRET};
    use axum::http::Request;
    use chrono::Utc;

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = header {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let ctx = context();
        let mut parts = parts_with(None);
        let result = Auth::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));

        let mut parts = parts_with(Some("Token abc".to_string()));
        let result = Auth::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_accepts_signed_token() {
        let ctx = context();
        let mut parts = parts_with(Some(format!("Bearer {}", token("admin_1", Some("admin")))));

        let Auth(user) = Auth::from_request_parts(&mut parts, &ctx.state).await.unwrap();
        assert_eq!(user.user_id, "admin_1");
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn auth_extractor_rejects_wrong_secret_and_expired_tokens() {
        let ctx = context();
        let exp = Utc::now().timestamp() + 3600;

        let forged = token_with("another-secret", "admin_1", Some("super_admin"), exp);
        let mut parts = parts_with(Some(format!("Bearer {forged}")));
        let result = Auth::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::InvalidSignature)));

        let expired = token_with(TEST_SECRET, "admin_1", Some("admin"), Utc::now().timestamp() - 600);
        let mut parts = parts_with(Some(format!("Bearer {expired}")));
        let result = Auth::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));

        let mut parts = parts_with(Some("Bearer not.a.jwt".to_string()));
        let result = Auth::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::MalformedToken)));
    }

    #[tokio::test]
    async fn admin_only_rejects_plain_users() {
        let ctx = context();
        let mut parts = parts_with(Some(format!("Bearer {}", token("user_1", None))));
        let result = AdminOnly::from_request_parts(&mut parts, &ctx.state).await;
        assert!(matches!(result, Err(AuthError::InsufficientPermissions)));

        let mut parts = parts_with(Some(format!("Bearer {}", token("super_1", Some("super_admin")))));
        let AdminOnly(user) = AdminOnly::from_request_parts(&mut parts, &ctx.state)
            .await
            .unwrap();
        assert_eq!(user.role, Role::SuperAdmin);
    }

    #[test]
    fn audience_is_enforced_when_configured() {
        use crate::auth::claims::JwtClaims;
        use jsonwebtoken::{encode, EncodingKey, Header};

        let signed_for = |aud: &str| {
            let claims = JwtClaims {
                sub: "admin_1".to_string(),
                exp: Utc::now().timestamp() + 3600,
                iat: None,
                aud: Some(serde_json::json!(aud)),
                session_id: None,
                app_metadata: None,
            };
            encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
            )
            .unwrap()
        };

        let result = verify_signed(&signed_for("wallet-app"), TEST_SECRET, Some("custody-admin"));
        assert!(matches!(result, Err(AuthError::InvalidAudience)));

        let user = verify_signed(&signed_for("custody-admin"), TEST_SECRET, Some("custody-admin")).unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[cfg(not(feature = "dev"))]
    #[test]
    fn missing_secret_rejects_without_dev_feature() {
        let config = AuthConfig::default();
        let result = verify_jwt(&token("admin_1", Some("admin")), &config);
        assert!(matches!(result, Err(AuthError::NotConfigured)));
    }
}
