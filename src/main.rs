// Define data modules
mod config; // Environment configuration (port, database path)
mod error; // Error kinds and their HTTP mapping
mod models; // Data structures (User, Todo, Db)
mod response; // Uniform {success, message, data, error} envelope
mod routes_auth; // HTTP handlers for register/login/logout
mod routes_todos; // HTTP handlers for the todo CRUD API
mod session; // Session cookie middleware
mod store; // Persistent storage (load/save db.json) and CRUD

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let config = config::Config::from_env().expect("invalid configuration");
    let store = Arc::new(Store::open(&config.data_path).expect("failed to open database file"));

    let api = Router::new()
        // auth
        .route("/auth/register", post(routes_auth::register))
        .route("/auth/login", post(routes_auth::login))
        .route("/auth/logout", post(routes_auth::logout))
        // todos
        .route(
            "/todos",
            get(routes_todos::list_todos).post(routes_todos::create_todo),
        )
        .route(
            "/todos/:id",
            get(routes_todos::get_todo)
                .put(routes_todos::update_todo)
                .patch(routes_todos::patch_todo_status)
                .delete(routes_todos::delete_todo),
        );

    let app = Router::new()
        .nest("/api", api)
        // Static pages (home, register, to-do) served for any non-API path
        .fallback_service(ServeDir::new("static"))
        .layer(middleware::from_fn(session::session_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(store);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!("server running at http://{addr}");
    tracing::info!("API base: http://{addr}/api");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind failed");

    axum::serve(listener, app).await.expect("server error");
}
