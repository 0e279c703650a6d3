use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use lazy_static::lazy_static;
use password_hash::rand_core::OsRng;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, SqlErr,
};
use sea_orm::ActiveValue::{NotSet, Set};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest},
    entity::users::{ActiveModel, Column, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Role, User, user_from_entity},
    revocation,
    state::AppState,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref UPPER_RE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref LOWER_RE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref DIGIT_RE: Regex = Regex::new(r"[0-9]").unwrap();
    static ref SPECIAL_RE: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long");
    }
    if !UPPER_RE.is_match(password) {
        return Err("Password must contain at least one uppercase letter");
    }
    if !LOWER_RE.is_match(password) {
        return Err("Password must contain at least one lowercase letter");
    }
    if !DIGIT_RE.is_match(password) {
        return Err("Password must contain at least one digit");
    }
    if !SPECIAL_RE.is_match(password) {
        return Err("Password must contain at least one special character");
    }
    Ok(())
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub fn issue_token(jwt: &JwtConfig, user: &UserModel) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(jwt.ttl_seconds))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        username: user.username.clone(),
        jti: Uuid::new_v4().to_string(),
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{field} is required")))
}

fn map_unique_violation(err: DbErr, message: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(message.into()),
        _ => err.into(),
    }
}

/// The very first account becomes an admin; everyone after that is a plain user.
pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    let username = required(payload.username, "username")?;
    let email = required(payload.email, "email")?;
    let password = required(payload.password, "password")?;

    validate_password(&password).map_err(|m| AppError::BadRequest(m.into()))?;
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let username_taken = Users::find()
        .filter(Column::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?
        .is_some();
    if username_taken {
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let email_taken = Users::find()
        .filter(Column::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let role = if Users::find().count(&state.orm).await? == 0 {
        Role::Admin
    } else {
        Role::User
    };

    let active = ActiveModel {
        id: NotSet,
        username: Set(username),
        email: Set(email),
        password_hash: Set(hash_password(&password)?),
        role: Set(role.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
        last_login: Set(None),
    };
    let user = active
        .insert(&state.orm)
        .await
        .map_err(|e| map_unique_violation(e, "Username or email already exists"))?;

    tracing::info!(user_id = user.id, role = %user.role, "user registered");
    Ok(user_from_entity(user))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let (username, password) = match (payload.username, payload.password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => (u, p),
        _ => {
            return Err(AppError::BadRequest(
                "Username and password are required".into(),
            ));
        }
    };

    let user = Users::find()
        .filter(Column::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;

    let user = match user {
        Some(u) if u.is_active && verify_password(&password, &u.password_hash)? => u,
        _ => {
            tracing::debug!(username = %username, "login rejected");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
    };

    let mut active: ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now().into()));
    let user = active.update(&state.orm).await?;

    let access_token = issue_token(&state.config.jwt, &user)?;
    tracing::info!(user_id = user.id, "user logged in");

    Ok(LoginResponse {
        access_token,
        user: user_from_entity(user),
    })
}

pub async fn logout_user(state: &AppState, user: &AuthUser) -> AppResult<()> {
    revocation::revoke(&state.pool, &user.jti, user.expires_at).await?;
    tracing::info!(user_id = user.user_id, "token revoked");
    Ok(())
}

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<User> {
    Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .map(user_from_entity)
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<User> {
    let existing = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(password) = payload.password.as_deref() {
        validate_password(password).map_err(|m| AppError::BadRequest(m.into()))?;
    }

    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email format".into()));
        }
        let taken = Users::find()
            .filter(Column::Email.eq(email))
            .filter(Column::Id.ne(existing.id))
            .one(&state.orm)
            .await?
            .is_some();
        if taken {
            return Err(AppError::Conflict("Email already exists".into()));
        }
    }

    let mut active: ActiveModel = existing.clone().into();
    if let Some(email) = payload.email {
        active.email = Set(email);
    }
    if let Some(password) = payload.password {
        active.password_hash = Set(hash_password(&password)?);
    }

    if !active.is_changed() {
        return Ok(user_from_entity(existing));
    }

    let updated = active
        .update(&state.orm)
        .await
        .map_err(|e| map_unique_violation(e, "Email already exists"))?;
    tracing::info!(user_id = updated.id, "profile updated");
    Ok(user_from_entity(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_token;

    #[test]
    fn password_policy_messages() {
        assert_eq!(
            validate_password("Ab1!"),
            Err("Password must be at least 8 characters long")
        );
        assert_eq!(
            validate_password("abcdefg1!"),
            Err("Password must contain at least one uppercase letter")
        );
        assert_eq!(
            validate_password("ABCDEFG1!"),
            Err("Password must contain at least one lowercase letter")
        );
        assert_eq!(
            validate_password("Abcdefgh!"),
            Err("Password must contain at least one digit")
        );
        assert_eq!(
            validate_password("Abcdefg12"),
            Err("Password must contain at least one special character")
        );
        assert_eq!(validate_password("Admin123!"), Ok(()));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("admin@catalog.com"));
        assert!(!is_valid_email("admin"));
        assert!(!is_valid_email("admin@catalog"));
        assert!(!is_valid_email("ad min@catalog.com"));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("Secret123!").unwrap();
        assert_ne!(hash, "Secret123!");
        assert!(verify_password("Secret123!", &hash).unwrap());
        assert!(!verify_password("secret123!", &hash).unwrap());
    }

    #[test]
    fn issued_token_carries_identity() {
        let jwt = JwtConfig {
            secret: "test-secret".into(),
            ttl_seconds: 3600,
        };
        let now = Utc::now().into();
        let user = UserModel {
            id: 12,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            role: "moderator".into(),
            is_active: true,
            created_at: now,
            last_login: None,
        };

        let first = issue_token(&jwt, &user).unwrap();
        let second = issue_token(&jwt, &user).unwrap();
        let a = decode_token(&first, &jwt.secret).unwrap();
        let b = decode_token(&second, &jwt.secret).unwrap();

        assert_eq!(a.sub, "12");
        assert_eq!(a.role, "moderator");
        assert_eq!(a.username, "alice");
        assert_eq!(a.exp - a.iat, 3600);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn required_rejects_missing_and_empty() {
        assert_eq!(
            required(None, "email").unwrap_err().to_string(),
            "email is required"
        );
        assert!(required(Some(String::new()), "username").is_err());
        assert_eq!(required(Some("bob".into()), "username").unwrap(), "bob");
    }
}
