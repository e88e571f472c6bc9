use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    error::{AppError, AppResult},
    models::{Actor, User, UserProfile, UserRole},
    state::AppState,
};

const TOKEN_TTL_HOURS: i64 = 24;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(secret: &str, user_id: Uuid, role: UserRole) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(TOKEN_TTL_HOURS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Decodes a bearer token into the caller it was issued for.
pub fn verify_token(secret: &str, token: &str) -> AppResult<Actor> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
    let role = match decoded.claims.role.as_str() {
        "admin" => UserRole::Admin,
        "customer" => UserRole::Customer,
        _ => return Err(AppError::Unauthorized),
    };
    Ok(Actor { id, role })
}

async fn audit(state: &AppState, user_id: Uuid, action: &str) {
    if let Err(err) = log_audit(
        &state.store,
        Some(user_id),
        action,
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<UserProfile> {
    create_user(state, payload, UserRole::Customer).await
}

/// Stores a new account; email and phone must both be unused.
pub async fn create_user(
    state: &AppState,
    payload: RegisterRequest,
    role: UserRole,
) -> AppResult<UserProfile> {
    let RegisterRequest {
        email,
        phone,
        full_name,
        password,
    } = payload;
    let email = email.trim().to_string();
    let phone = phone.trim().to_string();

    if email.is_empty() || phone.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email, phone and password are required".into(),
        ));
    }
    if state.users.get_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email is already taken".into()));
    }
    if state.users.get_by_phone(&phone).await?.is_some() {
        return Err(AppError::Conflict("Phone is already taken".into()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email,
        phone,
        full_name,
        password_hash: hash_password(&password)?,
        role,
        created_at: now,
        updated_at: now,
    };
    let user = state.users.create(&user).await?;
    audit(state, user.id, "user_register").await;

    Ok(UserProfile::from(user))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest {
        identifier,
        password,
    } = payload;
    let identifier = identifier.trim();

    let user = match state.users.get_by_email(identifier).await? {
        Some(user) => Some(user),
        None => state.users.get_by_phone(identifier).await?,
    };
    let Some(user) = user else {
        return Err(AppError::BadRequest("Invalid credentials".into()));
    };
    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::BadRequest("Invalid credentials".into()));
    }

    let token = issue_token(&state.config.jwt_secret, user.id, user.role)?;
    audit(state, user.id, "user_login").await;

    Ok(LoginResponse {
        token: format!("Bearer {}", token),
        user: UserProfile::from(user),
    })
}
