use crate::errors::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use ulid::{Generator, Ulid};

// 同一ミリ秒内でも生成順に並ぶよう単調増加で採番する
static GENERATOR: Mutex<Generator> = Mutex::new(Generator::new());

/// ToDo ID（ULID 文字列）
///
/// レコードストアが採番する識別子で、作成後は変化しない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(String);

impl TodoId {
    /// 新しい ToDo ID を生成
    pub fn new() -> Self {
        let ulid = GENERATOR
            .lock()
            .ok()
            .and_then(|mut generator| generator.generate().ok())
            .unwrap_or_else(Ulid::new);
        Self(ulid.to_string())
    }

    /// 文字列を ULID として検証し ToDo ID を作成
    pub fn parse(id: &str) -> Result<Self, DomainError> {
        Ulid::from_string(id)
            .map(|ulid| Self(ulid.to_string()))
            .map_err(|_| DomainError::InvalidTodoId(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ULID に埋め込まれた生成時刻（ミリ秒）
    pub fn timestamp_ms(&self) -> Option<u64> {
        Ulid::from_string(&self.0)
            .ok()
            .map(|ulid| ulid.timestamp_ms())
    }
}

impl Default for TodoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ユーザーID（認証済み呼び出し元の subject）
///
/// ID プロバイダが発行する不透明な文字列で、形式は問わない。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// 文字列からユーザーIDを作成
    pub fn from_string(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidUserId(
                "User ID cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_todo_id_new_generates_26_char_string() {
        // Act: 新しいTodoIdを生成
        let todo_id = TodoId::new();

        // Assert: 26文字のBase32形式であることを確認
        assert_eq!(todo_id.as_str().len(), 26);
        let valid_chars = "0123456789ABCDEFGHJKMNPQRSTVWXYZ";
        for c in todo_id.as_str().chars() {
            assert!(valid_chars.contains(c), "Invalid character: {c}");
        }
        assert!(todo_id.timestamp_ms().is_some());
    }

    #[test]
    fn test_todo_ids_sort_in_generation_order() {
        // 同一ミリ秒内に大量に生成しても辞書順が生成順と一致する
        let ids: Vec<TodoId> = (0..1000).map(|_| TodoId::new()).collect();

        for pair in ids.windows(2) {
            assert!(pair[0].as_str() < pair[1].as_str(), "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_todo_id_parse_accepts_generated_ids() {
        let todo_id = TodoId::new();
        let parsed = TodoId::parse(todo_id.as_str()).unwrap();
        assert_eq!(parsed, todo_id);
    }

    #[test]
    fn test_todo_id_parse_rejects_garbage() {
        assert_eq!(
            TodoId::parse("blah"),
            Err(DomainError::InvalidTodoId("blah".to_string()))
        );
        assert!(TodoId::parse("").is_err());
        // Mongo ObjectId 形式（24桁16進）は ULID ではない
        assert!(TodoId::parse("000000000000000000000002").is_err());
    }

    #[test]
    fn test_todo_id_parse_normalizes_lowercase() {
        let parsed = TodoId::parse("01arz3ndektsv4rrffq69g5fav").unwrap();
        assert_eq!(parsed.as_str(), "01ARZ3NDEKTSV4RRFFQ69G5FAV");
    }

    #[test]
    fn test_user_id_rejects_empty() {
        assert!(UserId::from_string(String::new()).is_err());
        let user = UserId::from_string("google-oauth2|1141".to_string()).unwrap();
        assert_eq!(user.as_str(), "google-oauth2|1141");
    }

    proptest! {
        #[test]
        fn prop_todo_id_rejects_wrong_length(s in "[0-9A-Z]{0,25}|[0-9A-Z]{27,40}") {
            prop_assert!(TodoId::parse(&s).is_err());
        }
    }
}
