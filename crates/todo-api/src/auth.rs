use crate::error::ApiError;
use crate::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use domain::UserId;
use shared::bearer_token;

/// 検証済みの呼び出し元。認証ミドルウェアがリクエスト拡張に格納する。
#[derive(Debug, Clone)]
pub struct Caller(pub UserId);

/// Bearer トークンを検証し、失敗時はハンドラに到達させず 401 を返す
pub async fn require_caller(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header)?.to_string();

    let user = state.verifier.verify(&token).await.map_err(|e| {
        tracing::warn!(reason = %e, path = %request.uri().path(), "token rejected");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(Caller(user));
    Ok(next.run(request).await)
}
