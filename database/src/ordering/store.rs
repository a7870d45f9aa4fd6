use super::{ListItemRecord, OrderingResult, Placement, RowId};
use crate::ListItem;
use std::ops::RangeInclusive;
use uuid::Uuid;

/// Something that can open transactions for the ordering engine.
#[async_trait::async_trait]
pub trait ListStore: Send + Sync {
    type Transaction: ListTransaction;

    async fn begin(&self) -> OrderingResult<Self::Transaction>;
}

/// The statements the engine runs inside one transaction.
///
/// Dropping a transaction without calling [`commit`](ListTransaction::commit)
/// rolls back everything it did.
#[async_trait::async_trait]
pub trait ListTransaction: Send {
    async fn find_list(&mut self, list: Uuid) -> OrderingResult<Option<RowId>>;

    async fn find_item(&mut self, item: Uuid) -> OrderingResult<Option<RowId>>;

    async fn find_list_item(&mut self, list_item: Uuid) -> OrderingResult<Option<ListItem>>;

    /// Locks the list for the rest of the transaction. Returns `false` if the list is gone.
    async fn lock_list(&mut self, list_id: RowId) -> OrderingResult<bool>;

    async fn count(&mut self, list_id: RowId) -> OrderingResult<i32>;

    async fn id_at(&mut self, list_id: RowId, position: i32) -> OrderingResult<Option<RowId>>;

    /// Adds `delta` to the position of every list item of the list within `positions`.
    async fn shift(
        &mut self,
        list_id: RowId,
        positions: RangeInclusive<i32>,
        delta: i32,
    ) -> OrderingResult<u64>;

    async fn insert(&mut self, item_id: RowId, placement: Placement) -> OrderingResult<RowId>;

    async fn set_prev(&mut self, list_item_id: RowId, prev: Option<RowId>) -> OrderingResult<()>;

    async fn set_next(&mut self, list_item_id: RowId, next: Option<RowId>) -> OrderingResult<()>;

    async fn place(&mut self, list_item_id: RowId, placement: Placement) -> OrderingResult<()>;

    async fn delete(&mut self, list_item_id: RowId) -> OrderingResult<bool>;

    async fn record(&mut self, list_item_id: RowId) -> OrderingResult<ListItemRecord>;

    async fn records(
        &mut self,
        list_id: RowId,
        offset: i64,
        limit: i64,
    ) -> OrderingResult<Vec<ListItemRecord>>;

    async fn commit(self) -> OrderingResult<()>;
}
