use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

/// Name of the cookie holding the serialized identity of the logged-in user.
pub const SESSION_COOKIE: &str = "session";

/// Pages reachable without a session.
const PUBLIC_ROUTES: &[&str] = &["/", "/register"];

/// Identity carried by the session cookie. Unsigned: presence and
/// parseability are the only things checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Gates every route except the public pages, the auth endpoints and the
/// favicon. Logged-in visitors of a public page are sent to the todo list;
/// everyone else without a readable session cookie is sent home.
pub async fn session_middleware(jar: CookieJar, mut request: Request, next: Next) -> Response {
    let session = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| serde_json::from_str::<SessionUser>(cookie.value()).ok());

    let path = request.uri().path();

    if path.starts_with("/api/auth/") || path == "/favicon.ico" {
        return next.run(request).await;
    }

    if PUBLIC_ROUTES.contains(&path) {
        return match session {
            Some(_) => Redirect::to("/to-do").into_response(),
            None => next.run(request).await,
        };
    }

    match session {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => Redirect::to("/").into_response(),
    }
}
