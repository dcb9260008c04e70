//! ToDo アクセス層
//!
//! レコードストアへの CRUD に所有者チェックを加える。HTTP の概念は持たず、
//! 結果はタグ付きの列挙型で返す。

use crate::errors::TodoError;
use crate::identifiers::{TodoId, UserId};
use crate::store::TodoStore;
use crate::todo::{NewTodo, Todo, TodoChanges};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// 更新対象（ID と呼び出し元の所有者はサーバ側で決定する）
#[derive(Debug, Clone)]
pub struct TodoUpdate {
    pub id: TodoId,
    pub owner: UserId,
    pub changes: TodoChanges,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    /// 存在するが所有者が異なる
    Forbidden,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// 削除した、または元から存在しなかった
    Deleted,
    /// 所有者が異なるため削除しなかった
    Refused,
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, fields: NewTodo, owner: UserId) -> Result<Todo, TodoError> {
        let todo = Todo::create(fields, owner, Utc::now());
        self.store.insert(&todo).await?;
        debug!(todo_id = %todo.id, owner = %todo.user_id, "todo created");
        Ok(todo)
    }

    pub async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError> {
        self.store.find_by_owner(owner).await
    }

    /// 所有者に関係なく取得する。所有者チェックは呼び出し側で行う。
    pub async fn get_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        self.store.find_by_id(id).await
    }

    pub async fn update(&self, update: TodoUpdate) -> Result<UpdateOutcome, TodoError> {
        let Some(mut current) = self.store.find_by_id(&update.id).await? else {
            return Ok(UpdateOutcome::NotFound);
        };

        if !current.is_owned_by(&update.owner) {
            warn!(todo_id = %update.id, caller = %update.owner, "update refused: owner mismatch");
            return Ok(UpdateOutcome::Forbidden);
        }

        current.apply_changes(update.changes, Utc::now());
        if self.store.replace(&current).await? {
            Ok(UpdateOutcome::Updated)
        } else {
            Ok(UpdateOutcome::NotFound)
        }
    }

    pub async fn delete(&self, id: &TodoId, owner: &UserId) -> Result<DeleteOutcome, TodoError> {
        if let Some(existing) = self.store.find_by_id(id).await? {
            if !existing.is_owned_by(owner) {
                warn!(todo_id = %id, caller = %owner, "delete refused: owner mismatch");
                return Ok(DeleteOutcome::Refused);
            }
        }

        self.store.delete_by_id(id).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
