//! ToDo HTTP API（axum）
//!
//! `/api/todos` 以下は全て認証必須。処理順は
//! トークン検証 → ID 形式検証 → ハンドラ → アクセス層。

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;

use axum::routing::get;
use axum::{middleware, Router};
use domain::{TodoService, TodoStore};
use shared::TokenVerifier;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// アプリケーションの共有状態
#[derive(Clone)]
pub struct AppState {
    pub service: TodoService,
    pub verifier: Arc<dyn TokenVerifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn TodoStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            service: TodoService::new(store),
            verifier,
        }
    }
}

/// ルータを構築して返します。
pub fn app(state: AppState) -> Router {
    let todos = Router::new()
        .route("/todos", get(handlers::list_todos).post(handlers::create_todo))
        .route(
            "/todos/:id",
            get(handlers::get_todo)
                .put(handlers::update_todo)
                .delete(handlers::delete_todo),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_caller,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", todos)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
