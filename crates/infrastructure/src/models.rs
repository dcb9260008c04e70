use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{Todo, TodoError, TodoId, UserId};
use std::collections::HashMap;

/// 所有者検索用 GSI の名前
pub const OWNER_INDEX: &str = "GSI1";

/// ToDo テーブルのキー構造
///
/// ID 検索はベーステーブル、所有者検索は GSI1 を使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String,
    pub sk: String,
    pub gsi1_pk: String,
    pub gsi1_sk: String,
}

impl DynamoDbKeys {
    pub fn for_todo(todo: &Todo) -> Self {
        Self {
            pk: todo_pk(&todo.id),
            sk: TODO_SK.to_string(),
            gsi1_pk: owner_pk(&todo.user_id),
            gsi1_sk: todo.id.as_str().to_string(),
        }
    }
}

const TODO_SK: &str = "TODO";

pub fn todo_pk(id: &TodoId) -> String {
    format!("TODO#{}", id.as_str())
}

pub fn owner_pk(owner: &UserId) -> String {
    format!("USER#{}", owner.as_str())
}

/// ベーステーブルの主キー
pub fn primary_key(id: &TodoId) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("PK".to_string(), AttributeValue::S(todo_pk(id))),
        ("SK".to_string(), AttributeValue::S(TODO_SK.to_string())),
    ])
}

/// ToDo を DynamoDB AttributeValue マップに変換
pub fn to_attribute_map(todo: &Todo) -> HashMap<String, AttributeValue> {
    let keys = DynamoDbKeys::for_todo(todo);
    let mut map = HashMap::new();

    map.insert("PK".to_string(), AttributeValue::S(keys.pk));
    map.insert("SK".to_string(), AttributeValue::S(keys.sk));
    map.insert("GSI1PK".to_string(), AttributeValue::S(keys.gsi1_pk));
    map.insert("GSI1SK".to_string(), AttributeValue::S(keys.gsi1_sk));

    map.insert("id".to_string(), AttributeValue::S(todo.id.as_str().to_string()));
    map.insert("title".to_string(), AttributeValue::S(todo.title.clone()));
    if let Some(description) = &todo.description {
        map.insert("description".to_string(), AttributeValue::S(description.clone()));
    }
    if let Some(is_complete) = todo.is_complete {
        map.insert("isComplete".to_string(), AttributeValue::Bool(is_complete));
    }
    map.insert("dueDate".to_string(), AttributeValue::S(todo.due_date.to_rfc3339()));
    map.insert("userID".to_string(), AttributeValue::S(todo.user_id.as_str().to_string()));
    map.insert("createdAt".to_string(), AttributeValue::S(todo.created_at.to_rfc3339()));
    map.insert("updatedAt".to_string(), AttributeValue::S(todo.updated_at.to_rfc3339()));

    map
}

/// DynamoDB AttributeValue マップから ToDo を復元
pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Todo, TodoError> {
    let id = TodoId::parse(required_s(map, "id")?)?;
    let user_id = UserId::from_string(required_s(map, "userID")?.clone())?;

    let description = map.get("description").and_then(|v| v.as_s().ok()).cloned();
    let is_complete = map.get("isComplete").and_then(|v| v.as_bool().ok()).copied();

    Ok(Todo {
        id,
        title: required_s(map, "title")?.clone(),
        description,
        is_complete,
        due_date: required_time(map, "dueDate")?,
        user_id,
        created_at: required_time(map, "createdAt")?,
        updated_at: required_time(map, "updatedAt")?,
    })
}

fn required_s<'a>(map: &'a HashMap<String, AttributeValue>, name: &str) -> Result<&'a String, TodoError> {
    map.get(name)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| TodoError::Store(format!("Missing {name}")))
}

fn required_time(map: &HashMap<String, AttributeValue>, name: &str) -> Result<DateTime<Utc>, TodoError> {
    let raw = required_s(map, name)?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TodoError::Store(format!("Invalid {name}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domain::NewTodo;

    fn sample(description: Option<&str>, is_complete: Option<bool>) -> Todo {
        let due = Utc.with_ymd_and_hms(2021, 3, 19, 7, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
        let fields = NewTodo::new("Prepare lab 04".to_string(), due)
            .unwrap()
            .with_description(description.map(str::to_string))
            .with_completion(is_complete);
        Todo::create(fields, UserId::from_string("u1".to_string()).unwrap(), now)
    }

    #[test]
    fn test_keys_for_todo() {
        let todo = sample(None, None);
        let keys = DynamoDbKeys::for_todo(&todo);

        assert_eq!(keys.pk, format!("TODO#{}", todo.id));
        assert_eq!(keys.sk, "TODO");
        assert_eq!(keys.gsi1_pk, "USER#u1");
        assert_eq!(keys.gsi1_sk, todo.id.as_str());
    }

    #[test]
    fn test_optional_attributes_are_omitted() {
        let todo = sample(None, None);
        let map = to_attribute_map(&todo);

        assert!(!map.contains_key("description"));
        assert!(!map.contains_key("isComplete"));
        assert_eq!(from_attribute_map(&map).unwrap(), todo);
    }

    #[test]
    fn test_attribute_map_restores_record() {
        let todo = sample(Some("model solution"), Some(false));
        let map = to_attribute_map(&todo);

        assert_eq!(map.get("isComplete"), Some(&AttributeValue::Bool(false)));
        assert_eq!(from_attribute_map(&map).unwrap(), todo);
    }

    #[test]
    fn test_missing_attribute_is_store_error() {
        let mut map = to_attribute_map(&sample(None, None));
        map.remove("dueDate");

        let err = from_attribute_map(&map).unwrap_err();
        assert!(matches!(err, TodoError::Store(msg) if msg == "Missing dueDate"));
    }
}
