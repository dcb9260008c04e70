use async_trait::async_trait;
use domain::{Todo, TodoError, TodoId, TodoStore, UserId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// プロセス内で完結するレコードストア（ローカル開発/テスト用）
///
/// 挿入順を保持し、テストから観測できるよう操作回数を数える。
#[derive(Debug, Default)]
pub struct InMemoryTodoStore {
    todos: RwLock<Vec<Todo>>,
    operations: AtomicUsize,
}

impl InMemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存レコードで初期化（操作回数には含めない）
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos: RwLock::new(todos),
            operations: AtomicUsize::new(0),
        }
    }

    /// これまでにストアへ到達した操作の回数
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.todos.read().map(|todos| todos.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 現在の内容の複製
    pub fn snapshot(&self) -> Vec<Todo> {
        self.todos.read().map(|todos| todos.clone()).unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<Todo>>, TodoError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.todos
            .read()
            .map_err(|_| TodoError::Store("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Todo>>, TodoError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        self.todos
            .write()
            .map_err(|_| TodoError::Store("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TodoStore for InMemoryTodoStore {
    async fn insert(&self, todo: &Todo) -> Result<(), TodoError> {
        let mut todos = self.write()?;
        if todos.iter().any(|existing| existing.id == todo.id) {
            return Err(TodoError::Store(format!("duplicate id {}", todo.id)));
        }
        todos.push(todo.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError> {
        Ok(self.read()?.iter().find(|todo| &todo.id == id).cloned())
    }

    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError> {
        Ok(self
            .read()?
            .iter()
            .filter(|todo| &todo.user_id == owner)
            .cloned()
            .collect())
    }

    async fn replace(&self, todo: &Todo) -> Result<bool, TodoError> {
        let mut todos = self.write()?;
        match todos.iter_mut().find(|existing| existing.id == todo.id) {
            Some(slot) => {
                *slot = todo.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: &TodoId) -> Result<(), TodoError> {
        self.write()?.retain(|todo| &todo.id != id);
        Ok(())
    }
}
