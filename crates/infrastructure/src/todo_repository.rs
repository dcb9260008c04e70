use crate::dynamodb::DynamoDbClient;
use crate::models::{from_attribute_map, owner_pk, primary_key, to_attribute_map, OWNER_INDEX};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use domain::{Todo, TodoError, TodoId, TodoStore, UserId};
use std::time::Instant;
use tracing::{error, info};

/// DynamoDB をレコードストアとして使う実装
#[derive(Clone)]
pub struct DynamoTodoStore {
    db: DynamoDbClient,
    page_size: Option<i32>,
}

impl DynamoTodoStore {
    pub fn new(db: DynamoDbClient) -> Self {
        Self { db, page_size: None }
    }

    /// 所有者検索 1 ページあたりの最大件数（未指定なら DynamoDB の 1MB 上限まで）
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

fn store_error(operation: &str, table: &str, e: impl std::error::Error + 'static) -> TodoError {
    let message = DisplayErrorContext(e).to_string();
    error!(table, operation, error = %message, "DynamoDB operation failed");
    TodoError::Store(message)
}

#[async_trait]
impl TodoStore for DynamoTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), TodoError> {
        let started = Instant::now();
        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(to_attribute_map(todo)))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(|e| store_error("put_item", self.db.table_name(), e))?;

        info!(
            table = self.db.table_name(),
            todo_id = %todo.id,
            duration_ms = started.elapsed().as_millis(),
            "todo inserted"
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        let result = self
            .db
            .client()
            .get_item()
            .table_name(self.db.table_name())
            .set_key(Some(primary_key(id)))
            .send()
            .await
            .map_err(|e| store_error("get_item", self.db.table_name(), e))?;

        result.item().map(from_attribute_map).transpose()
    }

    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError> {
        let mut todos = Vec::new();
        let mut start_key = None;

        // LastEvaluatedKey が無くなるまでページを辿る
        loop {
            let page = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .index_name(OWNER_INDEX)
                .key_condition_expression("GSI1PK = :owner")
                .expression_attribute_values(":owner", AttributeValue::S(owner_pk(owner)))
                .scan_index_forward(true)
                .set_limit(self.page_size)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| store_error("query", self.db.table_name(), e))?;

            for item in page.items() {
                todos.push(from_attribute_map(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) => start_key = Some(key.clone()),
                None => break,
            }
        }

        Ok(todos)
    }

    async fn replace(&self, todo: &Todo) -> Result<bool, TodoError> {
        let result = self
            .db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(to_attribute_map(todo)))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e)
                if matches!(
                    e.as_service_error(),
                    Some(PutItemError::ConditionalCheckFailedException(_))
                ) =>
            {
                // 読み込み後に別リクエストで削除された
                Ok(false)
            }
            Err(e) => Err(store_error("put_item", self.db.table_name(), e)),
        }
    }

    async fn delete_by_id(&self, id: &TodoId) -> Result<(), TodoError> {
        self.db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(primary_key(id)))
            .send()
            .await
            .map_err(|e| store_error("delete_item", self.db.table_name(), e))?;

        Ok(())
    }
}
