mod common;

use catalog_api::{
    dto::{
        admin::UpdateUserRequest,
        auth::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    },
    error::AppError,
    middleware::auth::{AuthUser, decode_token},
    revocation,
    services::{admin_service, auth_service},
};
use chrono::DateTime;

fn register(username: &str, email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        username: Some(username.into()),
        email: Some(email.into()),
        password: Some(password.into()),
    }
}

fn login(username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        username: Some(username.into()),
        password: Some(password.into()),
    }
}

#[tokio::test]
async fn registration_login_logout_and_admin() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let first = auth_service::register_user(&state, register("root", "root@example.com", "Admin123!")).await?;
    assert_eq!(first.role, "admin");
    let second = auth_service::register_user(&state, register("carol", "carol@example.com", "Carol123!")).await?;
    assert_eq!(second.role, "user");

    let duplicate =
        auth_service::register_user(&state, register("carol", "other@example.com", "Carol123!")).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    let same_email =
        auth_service::register_user(&state, register("dave", "carol@example.com", "Dave1234!")).await;
    assert!(matches!(same_email, Err(AppError::Conflict(_))));
    let weak = auth_service::register_user(&state, register("erin", "erin@example.com", "password")).await;
    assert!(matches!(weak, Err(AppError::BadRequest(_))));
    let bad_email = auth_service::register_user(&state, register("erin", "erin", "Erin1234!")).await;
    assert!(matches!(bad_email, Err(AppError::BadRequest(_))));

    let wrong = auth_service::login_user(&state, login("carol", "Wrong123!")).await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    let missing = auth_service::login_user(&state, LoginRequest::default()).await;
    assert!(matches!(missing, Err(AppError::BadRequest(_))));

    let session = auth_service::login_user(&state, login("carol", "Carol123!")).await?;
    assert!(session.user.last_login.is_some());
    let claims = decode_token(&session.access_token, &state.config.jwt.secret)?;
    assert_eq!(claims.sub, second.id.to_string());
    assert_eq!(claims.username, "carol");

    let carol = AuthUser {
        user_id: second.id,
        role: claims.role.clone(),
        username: claims.username.clone(),
        jti: claims.jti.clone(),
        expires_at: DateTime::from_timestamp(claims.exp as i64, 0).expect("valid exp"),
    };

    let profile = auth_service::update_profile(
        &state,
        &carol,
        UpdateProfileRequest {
            email: Some("carol@catalog.com".into()),
            password: None,
        },
    )
    .await?;
    assert_eq!(profile.email, "carol@catalog.com");
    let taken = auth_service::update_profile(
        &state,
        &carol,
        UpdateProfileRequest {
            email: Some("root@example.com".into()),
            password: None,
        },
    )
    .await;
    assert!(matches!(taken, Err(AppError::Conflict(_))));

    auth_service::logout_user(&state, &carol).await?;
    assert!(revocation::is_revoked(&state.pool, &claims.jti).await?);
    // logging out twice is harmless
    auth_service::logout_user(&state, &carol).await?;

    let root = common::auth_user(first.id, "admin", "root");
    let users = admin_service::list_users(&state, &root).await?;
    assert_eq!(users.len(), 2);

    let forbidden = admin_service::list_users(&state, &carol).await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let bad_role = admin_service::update_user(
        &state,
        &root,
        second.id,
        UpdateUserRequest {
            role: Some("superuser".into()),
            is_active: None,
        },
    )
    .await;
    assert!(matches!(bad_role, Err(AppError::BadRequest(_))));

    let promoted = admin_service::update_user(
        &state,
        &root,
        second.id,
        UpdateUserRequest {
            role: Some("moderator".into()),
            is_active: Some(false),
        },
    )
    .await?;
    assert_eq!(promoted.role, "moderator");
    assert!(!promoted.is_active);

    let inactive = auth_service::login_user(&state, login("carol", "Carol123!")).await;
    assert!(matches!(inactive, Err(AppError::Unauthorized(_))));

    let unknown = admin_service::update_user(&state, &root, 9_999, UpdateUserRequest::default()).await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    Ok(())
}
