// --------------------------------------------------
// Handles the todo CRUD endpoints under /api/todos.
//
// Responsibilities:
// - List todos, optionally scoped to one user
// - Create / read / update / delete todos
// - Status-only updates via PATCH
// --------------------------------------------------

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::TodoStatus;
use crate::response::ApiResponse;
use crate::store::{NewTodo, Store, TodoPatch};

fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::Validation("Invalid todo id".to_string()))
}

fn parse_due_date(raw: &str) -> Result<DateTime<FixedOffset>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|_| ApiError::Validation("Invalid due date format".to_string()))
}

fn parse_status(raw: &str) -> Result<TodoStatus, ApiError> {
    TodoStatus::parse(raw).ok_or_else(|| {
        ApiError::Validation(
            "Invalid status. Must be: pending, in-progress or completed".to_string(),
        )
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodosQuery {
    pub user_id: Option<String>,
}

// -----------------------------
// GET /api/todos
// All todos, or ?userId=<int> for one user's, in creation order
// -----------------------------
pub async fn list_todos(
    State(store): State<Arc<Store>>,
    Query(q): Query<TodosQuery>,
) -> Result<Response, ApiError> {
    let user_id = match q.user_id {
        Some(raw) => Some(
            raw.parse::<u64>()
                .map_err(|_| ApiError::Validation("Invalid userId".to_string()))?,
        ),
        None => None,
    };

    let todos = store.list_todos(user_id)?;
    Ok(Json(ApiResponse::ok("Todos retrieved successfully", Some(todos))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub user_id: Option<u64>,
    pub due_date: Option<String>, // RFC3339
    pub status: Option<String>,
}

// -----------------------------
// POST /api/todos
// Creates a todo; due date must not be in the past
// -----------------------------
pub async fn create_todo(
    State(store): State<Arc<Store>>,
    Json(input): Json<CreateTodoInput>,
) -> Result<Response, ApiError> {
    let title = match input.title {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => return Err(ApiError::Validation("Title is required".to_string())),
    };
    let user_id = input
        .user_id
        .ok_or_else(|| ApiError::Validation("UserId is required".to_string()))?;
    let raw_due = input
        .due_date
        .ok_or_else(|| ApiError::Validation("DueDate is required".to_string()))?;

    let due_date = parse_due_date(&raw_due)?;
    if due_date.with_timezone(&Utc) < Utc::now() {
        return Err(ApiError::Validation(
            "Due date must not be in the past".to_string(),
        ));
    }

    let status = input.status.as_deref().map(parse_status).transpose()?;

    let todo = store.add_todo(NewTodo {
        title,
        description: input
            .description
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
        user_id,
        due_date,
        status,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Todo created successfully", Some(todo))),
    )
        .into_response())
}

// -----------------------------
// GET /api/todos/:id
// -----------------------------
pub async fn get_todo(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let todo = store
        .get_todo(id)?
        .ok_or_else(|| ApiError::NotFound("Todo not found".to_string()))?;

    Ok(Json(ApiResponse::ok("Todo retrieved successfully", Some(todo))).into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<String>, // RFC3339
}

// -----------------------------
// PUT /api/todos/:id
// Partial update; absent fields stay untouched
// -----------------------------
pub async fn update_todo(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTodoInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    if store.get_todo(id)?.is_none() {
        return Err(ApiError::NotFound("Todo not found".to_string()));
    }

    let mut patch = TodoPatch::default();
    if let Some(title) = input.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("Title must not be empty".to_string()));
        }
        patch.title = Some(title.trim().to_string());
    }
    if let Some(description) = input.description {
        patch.description = Some(description.trim().to_string());
    }
    if let Some(status) = input.status.as_deref() {
        patch.status = Some(parse_status(status)?);
    }
    if let Some(due) = input.due_date.as_deref() {
        patch.due_date = Some(parse_due_date(due)?);
    }

    let todo = store.update_todo(id, patch)?;
    Ok(Json(ApiResponse::ok("Todo updated successfully", Some(todo))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct PatchTodoInput {
    pub status: Option<String>,
}

// -----------------------------
// PATCH /api/todos/:id
// Status-only quick update
// -----------------------------
pub async fn patch_todo_status(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
    Json(input): Json<PatchTodoInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    if store.get_todo(id)?.is_none() {
        return Err(ApiError::NotFound("Todo not found".to_string()));
    }

    let mut patch = TodoPatch::default();
    if let Some(status) = input.status.as_deref() {
        patch.status = Some(parse_status(status)?);
    }

    let todo = store.update_todo(id, patch)?;
    Ok(Json(ApiResponse::ok("Todo status updated successfully", Some(todo))).into_response())
}

// -----------------------------
// DELETE /api/todos/:id
// -----------------------------
pub async fn delete_todo(
    State(store): State<Arc<Store>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    store.delete_todo(id)?;

    Ok(Json(ApiResponse::ok(
        "Todo deleted successfully",
        Some(serde_json::json!({ "id": id })),
    ))
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::Request,
        routing::get,
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(Store::open(dir.path().join("db.json")).unwrap());
        let app = Router::new()
            .route("/api/todos", get(list_todos).post(create_todo))
            .route(
                "/api/todos/:id",
                get(get_todo)
                    .put(update_todo)
                    .patch(patch_todo_status)
                    .delete(delete_todo),
            )
            .with_state(store);
        (dir, app)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    fn buy_milk() -> serde_json::Value {
        serde_json::json!({
            "title": "Buy milk",
            "userId": 1,
            "dueDate": "2099-01-01T00:00:00Z",
        })
    }

    #[tokio::test]
    async fn create_returns_201_and_defaults_to_pending() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["id"], 1);
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["description"], "");
        assert_eq!(body["data"]["createdAt"], body["data"]["updatedAt"]);
    }

    #[tokio::test]
    async fn create_rejects_missing_fields_with_specific_messages() {
        let (_dir, app) = test_app();
        let cases = [
            (serde_json::json!({ "userId": 1, "dueDate": "2099-01-01T00:00:00Z" }), "Title is required"),
            (serde_json::json!({ "title": "x", "dueDate": "2099-01-01T00:00:00Z" }), "UserId is required"),
            (serde_json::json!({ "title": "x", "userId": 1 }), "DueDate is required"),
        ];

        for (payload, message) in cases {
            let (status, body) = send(&app, "POST", "/api/todos", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], message);
        }

        let (_, body) = send(&app, "GET", "/api/todos", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn create_rejects_past_due_date() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(serde_json::json!({
                "title": "Too late",
                "userId": 1,
                "dueDate": "2000-01-01T00:00:00Z",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Due date must not be in the past");

        let (_, body) = send(&app, "GET", "/api/todos", None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn create_rejects_malformed_due_date() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(serde_json::json!({
                "title": "x",
                "userId": 1,
                "dueDate": "next tuesday",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid due date format");
    }

    #[tokio::test]
    async fn create_accepts_explicit_status() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/todos",
            Some(serde_json::json!({
                "title": "Started already",
                "userId": 1,
                "dueDate": "2099-01-01T00:00:00Z",
                "status": "in-progress",
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "in-progress");
    }

    #[tokio::test]
    async fn list_filters_by_user_in_creation_order() {
        let (_dir, app) = test_app();
        for (title, user_id) in [("first", 1), ("other", 2), ("second", 1)] {
            send(
                &app,
                "POST",
                "/api/todos",
                Some(serde_json::json!({
                    "title": title,
                    "userId": user_id,
                    "dueDate": "2099-01-01T00:00:00Z",
                })),
            )
            .await;
        }

        let (status, body) = send(&app, "GET", "/api/todos?userId=1", None).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[tokio::test]
    async fn list_rejects_non_integer_user_id() {
        let (_dir, app) = test_app();
        let (status, body) = send(&app, "GET", "/api/todos?userId=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid userId");
    }

    #[tokio::test]
    async fn get_maps_unknown_and_malformed_ids() {
        let (_dir, app) = test_app();
        let (status, _) = send(&app, "GET", "/api/todos/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&app, "GET", "/api/todos/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid todo id");
    }

    #[tokio::test]
    async fn put_merges_partial_payload() {
        let (_dir, app) = test_app();
        let (_, created) = send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/todos/1",
            Some(serde_json::json!({ "description": "two litres" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["description"], "two litres");
        assert_eq!(body["data"]["title"], "Buy milk");
        assert_eq!(body["data"]["createdAt"], created["data"]["createdAt"]);
    }

    #[tokio::test]
    async fn put_rejects_blank_title() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/todos/1",
            Some(serde_json::json!({ "title": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Title must not be empty");
    }

    #[tokio::test]
    async fn put_on_unknown_id_is_404() {
        let (_dir, app) = test_app();
        let (status, _) = send(
            &app,
            "PUT",
            "/api/todos/7",
            Some(serde_json::json!({ "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_rejects_out_of_enum_status_and_keeps_record() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        let (status, body) = send(
            &app,
            "PATCH",
            "/api/todos/1",
            Some(serde_json::json!({ "status": "done" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (_, body) = send(&app, "GET", "/api/todos/1", None).await;
        assert_eq!(body["data"]["status"], "pending");
    }

    #[tokio::test]
    async fn patch_updates_status_without_enforcing_transitions() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        // Forward, then straight back: no transition rules.
        for status_name in ["completed", "pending", "in-progress"] {
            let (status, body) = send(
                &app,
                "PATCH",
                "/api/todos/1",
                Some(serde_json::json!({ "status": status_name })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["status"], status_name);
        }
    }

    #[tokio::test]
    async fn delete_confirms_id_then_fails_on_repeat() {
        let (_dir, app) = test_app();
        send(&app, "POST", "/api/todos", Some(buy_milk())).await;

        let (status, body) = send(&app, "DELETE", "/api/todos/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 1);

        let (status, body) = send(&app, "DELETE", "/api/todos/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Todo not found");
    }
}
