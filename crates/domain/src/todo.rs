use crate::errors::DomainError;
use crate::identifiers::{TodoId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ToDo レコード
///
/// JSON 表現はクライアントとの互換のため `_id` / `userID` / camelCase を用いる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id", alias = "id")]
    pub id: TodoId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_complete: Option<bool>,
    pub due_date: DateTime<Utc>,
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 作成時にクライアントが指定できるフィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub is_complete: Option<bool>,
    pub due_date: DateTime<Utc>,
}

impl NewTodo {
    /// タイトル必須を検証して作成
    pub fn new(title: String, due_date: DateTime<Utc>) -> Result<Self, DomainError> {
        validate_title(&title)?;
        Ok(Self {
            title,
            description: None,
            is_complete: None,
            due_date,
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_completion(mut self, is_complete: Option<bool>) -> Self {
        self.is_complete = is_complete;
        self
    }
}

/// 更新で置き換える可変フィールド。`None` は保存済みの値を維持する。
///
/// 任意フィールドは `Some(None)` で値を消去する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub is_complete: Option<Option<bool>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TodoChanges {
    pub fn validate(&self) -> Result<(), DomainError> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

impl Todo {
    /// 所有者を付与して新しいレコードを構築
    pub fn create(fields: NewTodo, owner: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: TodoId::new(),
            title: fields.title,
            description: fields.description,
            is_complete: fields.is_complete,
            due_date: fields.due_date,
            user_id: owner,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }

    /// 可変フィールドを反映する。`id` / `user_id` / `created_at` は変更しない。
    pub fn apply_changes(&mut self, changes: TodoChanges, now: DateTime<Utc>) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(is_complete) = changes.is_complete {
            self.is_complete = is_complete;
        }
        if let Some(due_date) = changes.due_date {
            self.due_date = due_date;
        }
        self.updated_at = now;
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    if title.is_empty() {
        return Err(DomainError::Validation("title is required".to_string()));
    }
    Ok(())
}
