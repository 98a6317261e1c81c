// Handlers for registration, login and logout under /api/auth.
//
// Registration never returns the stored record: the password hash must not
// leave the store. Login puts the public identity into the `session` cookie.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session::{SESSION_COOKIE, SessionUser};
use crate::store::{self, NewUser, Store};

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

// POST /api/auth/register
pub async fn register(
    State(store): State<Arc<Store>>,
    Json(input): Json<RegisterInput>,
) -> Result<Response, ApiError> {
    let (name, email, password) = match (input.name, input.email, input.password) {
        (Some(name), Some(email), Some(password))
            if !name.trim().is_empty() && !email.trim().is_empty() && !password.is_empty() =>
        {
            (name.trim().to_string(), email.trim().to_string(), password)
        }
        _ => {
            return Err(ApiError::Validation(
                "Name, email and password are required".to_string(),
            ));
        }
    };

    if store.find_user_by_email(&email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    store.add_user(NewUser {
        name,
        email,
        password,
    })?;

    Ok(Json(ApiResponse::<()>::ok("User registered successfully", None)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

// POST /api/auth/login
//
// Unknown email and wrong password get the same answer.
pub async fn login(
    State(store): State<Arc<Store>>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Response), ApiError> {
    let (email, password) = match (input.email, input.password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ));
        }
    };

    let user = store
        .find_user_by_email(&email)?
        .filter(|user| store::verify_password(&password, &user.password))
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let identity = SessionUser {
        id: user.id,
        name: user.name,
        email: user.email,
    };
    let cookie = Cookie::build((SESSION_COOKIE, serde_json::to_string(&identity)?))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    Ok((
        jar.add(cookie),
        Json(ApiResponse::ok("Login successful", Some(identity))).into_response(),
    ))
}

// POST /api/auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Response) {
    let cookie = Cookie::build(SESSION_COOKIE).path("/").build();
    (
        jar.remove(cookie),
        Json(ApiResponse::<()>::ok("Logged out successfully", None)).into_response(),
    )
}
