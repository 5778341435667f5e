/*!
 * # Authentication and Authorization Module
 *
 * Bearer JWT sessions for farm staff:
 *
 * - HS256 access tokens issued at login and checked by [`auth_middleware`]
 * - argon2 password hashes and SHA-256 hashed single-use tokens ([`password`])
 * - a static role table with `resource:action` permissions ([`rbac`])
 */

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::entities::user::{self, UserRole};
use crate::errors::ServiceError;
use crate::workflow::Actor;

pub mod password;
pub mod rbac;

pub use rbac::{consts, permissions_for, role_has_permission};

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub employee_id: Option<String>,
    pub permissions: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub employee_id: Option<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_permission(&self, permission: &str) -> bool {
        role_has_permission(self.role, permission)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// The identity recorded on rows this user writes.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.employee_id.clone(), self.role)
    }

    fn from_claims(claims: Claims) -> Result<Self, ServiceError> {
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".into()))?;
        let role = UserRole::from_str(&claims.role)
            .map_err(|_| ServiceError::Unauthorized("Invalid token role".into()))?;
        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            role,
            employee_id: claims.employee_id,
            permissions: claims.permissions,
            token_id: claims.jti,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Issues and validates access tokens.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn generate_token(&self, user: &user::Model) -> Result<TokenResponse, ServiceError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::InternalError("Invalid token duration".into()))?;

        let claims = Claims {
            sub: user.id.to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            employee_id: user.employee_id.clone(),
            permissions: permissions_for(user.role),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))?;

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::JwtError("Token has expired".into())
            }
            _ => ServiceError::JwtError("Invalid token".into()),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware that extracts and validates the bearer token.
/// Expects an `Arc<AuthService>` request extension.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return ServiceError::InternalError("Authentication service not available".into())
                .into_response();
        }
    };

    let user = match bearer_token(request.headers()) {
        Some(token) => auth_service
            .validate_token(token)
            .and_then(AuthUser::from_claims),
        None => Err(ServiceError::Unauthorized("Missing bearer token".into())),
    };

    match user {
        Ok(user) => {
            debug!(user_id = %user.user_id, role = %user.role, "authenticated request");
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Permission middleware to check if a user has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ServiceError::Unauthorized("Authentication required".into()))?;

    if !user.has_permission(&required_permission) {
        return Err(ServiceError::Forbidden(format!(
            "Missing permission {}",
            required_permission
        )));
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "k".repeat(64),
            jwt_audience: "farmops".into(),
            jwt_issuer: "farmops-auth".into(),
            access_token_expiration: Duration::from_secs(900),
        })
    }

    fn user(role: UserRole) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@farm.test".into(),
            employee_id: Some("EMP7".into()),
            password_hash: String::new(),
            role,
            email_verified: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_validates_into_auth_user() {
        let svc = service();
        let u = user(UserRole::Manager);
        let token = svc.generate_token(&u).unwrap();
        assert_eq!(token.token_type, "Bearer");

        let claims = svc.validate_token(&token.access_token).unwrap();
        let auth = AuthUser::from_claims(claims).unwrap();
        assert_eq!(auth.user_id, u.id);
        assert_eq!(auth.role, UserRole::Manager);
        assert!(auth.has_permission(consts::BATCHES_APPROVE));
        assert_eq!(auth.actor().display_id(), "EMP7");
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = service().generate_token(&user(UserRole::Worker)).unwrap();
        let mut other = service();
        other.config.jwt_secret = "z".repeat(64);
        assert_matches!(other.validate_token(&token.access_token), Err(ServiceError::JwtError(_)));
    }

    #[test]
    fn token_for_other_audience_is_rejected() {
        let token = service().generate_token(&user(UserRole::Worker)).unwrap();
        let mut other = service();
        other.config.jwt_audience = "elsewhere".into();
        assert!(other.validate_token(&token.access_token).is_err());
    }

    #[test]
    fn bearer_header_is_parsed() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
