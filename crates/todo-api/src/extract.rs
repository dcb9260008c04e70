use crate::error::ApiError;
use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use domain::TodoId;

pub const INVALID_ID: &str = "Invalid ID";

/// パスの `:id` をレコードストアの ID 形式として検証済みのもの
#[derive(Debug, Clone)]
pub struct ValidTodoId(pub TodoId);

#[async_trait]
impl<S> FromRequestParts<S> for ValidTodoId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request(INVALID_ID))?;

        TodoId::parse(&raw)
            .map(ValidTodoId)
            .map_err(|_| ApiError::bad_request(INVALID_ID))
    }
}
