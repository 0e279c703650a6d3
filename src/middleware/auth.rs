use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use sea_orm::EntityTrait;

use crate::{
    dto::auth::Claims,
    entity::{Users, products::Model as ProductModel, users::Model as UserModel},
    error::{AppError, AppResult},
    models::Role,
    revocation,
    state::AppState,
};

pub const TOKEN_COOKIE: &str = "access_token_cookie";

/// Caller identity taken from a verified, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: String,
    pub username: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Reloads the caller so that role changes and deactivation take effect
/// before the token expires.
pub async fn load_caller(state: &AppState, user: &AuthUser) -> AppResult<UserModel> {
    match Users::find_by_id(user.user_id).one(&state.orm).await? {
        Some(u) if u.is_active => Ok(u),
        _ => Err(AppError::Unauthorized("User not found or inactive".into())),
    }
}

pub async fn require_role(
    state: &AppState,
    user: &AuthUser,
    roles: &[Role],
) -> AppResult<UserModel> {
    let caller = load_caller(state, user).await?;
    if !has_role(&caller, roles) {
        tracing::debug!(user_id = caller.id, role = %caller.role, "insufficient permissions");
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }
    Ok(caller)
}

pub async fn ensure_admin(state: &AppState, user: &AuthUser) -> AppResult<UserModel> {
    require_role(state, user, &[Role::Admin]).await
}

pub fn has_role(caller: &UserModel, roles: &[Role]) -> bool {
    roles.iter().any(|r| r.as_str() == caller.role)
}

/// Admins may modify any product, everyone else only their own.
pub fn ensure_can_modify(caller: &UserModel, product: &ProductModel) -> AppResult<()> {
    if has_role(caller, &[Role::Admin]) || product.created_by == Some(caller.id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Permission denied".into()))
    }
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token has expired".into()),
        _ => AppError::Unauthorized("Invalid token".into()),
    })
}

/// Bearer header first, then the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if from_header.is_some() {
        return from_header;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == TOKEN_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Unauthorized("Authorization token is required".into()))?;

        let claims = decode_token(&token, &state.config.jwt.secret)?;

        if revocation::is_revoked(&state.pool, &claims.jti).await? {
            return Err(AppError::Unauthorized("Token has been revoked".into()));
        }

        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;
        let expires_at = DateTime::from_timestamp(claims.exp as i64, 0)
            .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
            username: claims.username,
            jti: claims.jti,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn user(id: i32, role: &str) -> UserModel {
        let now = Utc::now().into();
        UserModel {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            password_hash: "x".into(),
            role: role.into(),
            is_active: true,
            created_at: now,
            last_login: None,
        }
    }

    fn product(created_by: Option<i32>) -> ProductModel {
        let now = Utc::now().into();
        ProductModel {
            id: 1,
            name: "Mug".into(),
            description: None,
            price: 9.5,
            category: None,
            tags: None,
            created_by,
            created_at: now,
            updated_at: now,
            is_active: true,
        }
    }

    fn token(secret: &str, exp: i64) -> String {
        let claims = Claims {
            sub: "5".into(),
            role: "user".into(),
            username: "user5".into(),
            jti: "abc".into(),
            iat: Utc::now().timestamp() as usize,
            exp: exp as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn owner_or_admin_may_modify() {
        assert!(ensure_can_modify(&user(1, "user"), &product(Some(1))).is_ok());
        assert!(ensure_can_modify(&user(2, "admin"), &product(Some(1))).is_ok());
        assert!(matches!(
            ensure_can_modify(&user(2, "moderator"), &product(Some(1))),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_can_modify(&user(2, "user"), &product(None)).is_err());
    }

    #[test]
    fn role_membership() {
        let caller = user(1, "moderator");
        assert!(has_role(&caller, &[Role::Admin, Role::Moderator]));
        assert!(!has_role(&caller, &[Role::Admin]));
    }

    #[test]
    fn decodes_valid_token() {
        let exp = Utc::now().timestamp() + 600;
        let claims = decode_token(&token("secret", exp), "secret").unwrap();
        assert_eq!(claims.sub, "5");
        assert_eq!(claims.jti, "abc");
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        let exp = Utc::now().timestamp() + 600;
        let err = decode_token(&token("secret", exp), "other").unwrap_err();
        assert_eq!(err.to_string(), "Invalid token");

        let expired = Utc::now().timestamp() - 3600;
        let err = decode_token(&token("secret", expired), "secret").unwrap_err();
        assert_eq!(err.to_string(), "Token has expired");
    }

    #[test]
    fn token_from_header_or_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; access_token_cookie=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);
    }
}
