use crate::errors::TodoError;
use crate::identifiers::{TodoId, UserId};
use crate::todo::Todo;
use async_trait::async_trait;

/// レコードストアの最小抽象
///
/// 1 ドキュメント単位の読み書きのみを提供し、複数レコードにまたがる
/// トランザクションは持たない。
#[async_trait]
pub trait TodoStore: Send + Sync {
    /// 新しいドキュメントを追加
    async fn insert(&self, todo: &Todo) -> Result<(), TodoError>;

    /// ID で 1 件取得（所有者は問わない）
    async fn find_by_id(&self, id: &TodoId) -> Result<Option<Todo>, TodoError>;

    /// 所有者のドキュメントを挿入順で取得
    async fn find_by_owner(&self, owner: &UserId) -> Result<Vec<Todo>, TodoError>;

    /// 既存ドキュメントを置き換える。対象が存在しなければ `false`。
    async fn replace(&self, todo: &Todo) -> Result<bool, TodoError>;

    /// ID で削除。存在しない場合も成功とする。
    async fn delete_by_id(&self, id: &TodoId) -> Result<(), TodoError>;
}
