use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    routing::{get, post},
};

use crate::{
    config::AppConfig,
    dto::auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, UserEnvelope},
    error::AppResult,
    middleware::auth::{AuthUser, TOKEN_COOKIE},
    models::User,
    response::MessageResponse,
    routes::extract::ApiJson,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
}

fn session_cookie(config: &AppConfig, token: &str, max_age: i64) -> String {
    let secure = if config.cookie_secure { "; Secure" } else { "" };
    format!("{TOKEN_COOKIE}={token}; HttpOnly; Max-Age={max_age}; Path=/; SameSite=Lax{secure}")
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = UserEnvelope),
        (status = 400, description = "Missing field or weak password"),
        (status = 409, description = "Username or email already exists"),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserEnvelope>)> {
    let user = auth_service::register_user(&state, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User created successfully".into(),
            user,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user, also sets the session cookie", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> AppResult<([(header::HeaderName, String); 1], Json<LoginResponse>)> {
    let resp = auth_service::login_user(&state, payload).await?;
    let cookie = session_cookie(&state.config, &resp.access_token, state.config.jwt.ttl_seconds);
    Ok(([(header::SET_COOKIE, cookie)], Json(resp)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Token revoked and cookie cleared", body = MessageResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<([(header::HeaderName, String); 1], Json<MessageResponse>)> {
    auth_service::logout_user(&state, &user).await?;
    let cookie = session_cookie(&state.config, "", 0);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse::new("Successfully logged out")),
    ))
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<User>> {
    let profile = auth_service::get_profile(&state, &user).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserEnvelope),
        (status = 400, description = "Weak password or invalid email"),
        (status = 409, description = "Email already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<UserEnvelope>> {
    let user = auth_service::update_profile(&state, &user, payload).await?;
    Ok(Json(UserEnvelope {
        message: "Profile updated successfully".into(),
        user,
    }))
}
