use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Invalid TodoId: {0}")]
    InvalidTodoId(String),

    #[error("Invalid UserId: {0}")]
    InvalidUserId(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Error)]
pub enum TodoError {
    /// レコードストアの障害（接続断、スロットリング、データ破損など）
    #[error("Store error: {0}")]
    Store(String),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
