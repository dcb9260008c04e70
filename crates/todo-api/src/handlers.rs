use crate::auth::Caller;
use crate::error::ApiError;
use crate::extract::ValidTodoId;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use domain::{DeleteOutcome, NewTodo, Todo, TodoChanges, TodoUpdate, UpdateOutcome};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

pub const MISSING_TITLE: &str = "New todos must have a title";
pub const MISSING_DUE_DATE: &str = "New todos must have a due date";
pub const EMPTY_TITLE: &str = "Todos must have a title";
pub const MALFORMED_BODY: &str = "Malformed request body";

/// POST / PUT のリクエストボディ
///
/// `_id` や `userID` などサーバが決定するフィールドは読み捨てる。
/// 任意フィールドは省略（`None`）と明示的な `null`（`Some(None)`）を区別する。
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPayload {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub is_complete: Option<Option<bool>>,
    pub due_date: Option<DateTime<Utc>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl From<TodoPayload> for TodoChanges {
    fn from(payload: TodoPayload) -> Self {
        TodoChanges {
            title: payload.title,
            description: payload.description,
            is_complete: payload.is_complete,
            due_date: payload.due_date,
        }
    }
}

/// Content-Type に関係なく JSON として解釈する。空ボディは `{}` 扱い。
fn parse_payload(body: &Bytes) -> Result<TodoPayload, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TodoPayload::default());
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "request body rejected");
        ApiError::bad_request(MALFORMED_BODY)
    })
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthBody { status: "ok" })
}

pub async fn create_todo(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload = parse_payload(&body)?;

    let title = payload
        .title
        .filter(|title| !title.is_empty())
        .ok_or_else(|| ApiError::bad_request(MISSING_TITLE))?;
    let due_date = payload
        .due_date
        .ok_or_else(|| ApiError::bad_request(MISSING_DUE_DATE))?;

    let fields = NewTodo::new(title, due_date)
        .map_err(|_| ApiError::bad_request(MISSING_TITLE))?
        .with_description(payload.description.flatten())
        .with_completion(payload.is_complete.flatten());

    let todo = state.service.create(fields, caller).await?;
    info!(todo_id = %todo.id, owner = %todo.user_id, "Todo created");

    let location = format!("/api/todos/{}", todo.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(todo)))
}

pub async fn list_todos(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.service.list_for_owner(&caller).await?))
}

pub async fn get_todo(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    ValidTodoId(id): ValidTodoId,
) -> Result<Json<Todo>, ApiError> {
    let todo = state.service.get_by_id(&id).await?.ok_or(ApiError::NotFound)?;

    if !todo.is_owned_by(&caller) {
        tracing::warn!(todo_id = %id, caller = %caller, "read refused: owner mismatch");
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(todo))
}

pub async fn update_todo(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    ValidTodoId(id): ValidTodoId,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let changes = TodoChanges::from(parse_payload(&body)?);
    changes
        .validate()
        .map_err(|_| ApiError::bad_request(EMPTY_TITLE))?;

    // 対象はパスの ID、所有者は検証済みの呼び出し元で決まる
    let update = TodoUpdate {
        id,
        owner: caller,
        changes,
    };
    match state.service.update(update).await? {
        UpdateOutcome::Updated => Ok(StatusCode::NO_CONTENT),
        UpdateOutcome::NotFound => Err(ApiError::NotFound),
        UpdateOutcome::Forbidden => Err(ApiError::Unauthorized),
    }
}

pub async fn delete_todo(
    State(state): State<AppState>,
    Extension(Caller(caller)): Extension<Caller>,
    ValidTodoId(id): ValidTodoId,
) -> Result<StatusCode, ApiError> {
    match state.service.delete(&id, &caller).await? {
        DeleteOutcome::Deleted => Ok(StatusCode::NO_CONTENT),
        DeleteOutcome::Refused => Err(ApiError::Unauthorized),
    }
}
