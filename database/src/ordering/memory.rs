//! In-process store with the same transactional guarantees as Postgres, for tests.

use super::{
    Entity, ListItemRecord, ListStore, ListTransaction, OrderingError, OrderingResult, Placement,
    RowId,
};
use crate::ListItem;
use sqlx::types::time::OffsetDateTime;
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex as StdMutex, MutexGuard, PoisonError,
    },
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: RowId,
    lists: BTreeMap<RowId, Uuid>,
    items: BTreeMap<RowId, Uuid>,
    list_items: BTreeMap<RowId, ListItem>,
}

impl MemoryState {
    fn next_id(&mut self) -> RowId {
        self.last_id += 1;
        self.last_id
    }

    fn uuid_of(&self, list_item_id: Option<RowId>) -> Option<Uuid> {
        list_item_id
            .and_then(|id| self.list_items.get(&id))
            .map(|row| row.uuid)
    }

    fn record(&self, row: &ListItem) -> OrderingResult<ListItemRecord> {
        let list_uuid = self
            .lists
            .get(&row.list_id)
            .copied()
            .ok_or(OrderingError::NotFound(Entity::List))?;
        let item_uuid = self
            .items
            .get(&row.item_id)
            .copied()
            .ok_or(OrderingError::NotFound(Entity::Item))?;
        Ok(ListItemRecord {
            uuid: row.uuid,
            list_uuid,
            item_uuid,
            position: row.position,
            prev_uuid: self.uuid_of(row.prev_item_id),
            next_uuid: self.uuid_of(row.next_item_id),
            status_uuid: None,
            created_date: row.created_date,
        })
    }

    fn row_mut(&mut self, list_item_id: RowId) -> OrderingResult<&mut ListItem> {
        self.list_items
            .get_mut(&list_item_id)
            .ok_or(OrderingError::NotFound(Entity::ListItem))
    }

    fn apply(&mut self, written: &BTreeMap<RowId, Option<ListItem>>) {
        for (id, row) in written {
            match row {
                Some(row) => self.list_items.insert(*id, row.clone()),
                None => self.list_items.remove(id),
            };
        }
    }

    /// The deferred `(list_id, position)` uniqueness check.
    fn check_positions(&self) -> OrderingResult<()> {
        let mut seen = HashSet::new();
        for row in self.list_items.values() {
            if !seen.insert((row.list_id, row.position)) {
                return Err(OrderingError::ConflictRetryable);
            }
        }
        Ok(())
    }
}

/// Holds every list in memory. Clones share the same state.
///
/// [`lock_list`](ListTransaction::lock_list) takes a per-list lock that is held
/// until the transaction ends, like `SELECT .. FOR UPDATE` on the list row.
/// Writes go to a private overlay that is published on commit, and a write that
/// touches a list the transaction has not locked fails.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    committed: Arc<StdMutex<MemoryState>>,
    list_locks: Arc<StdMutex<HashMap<RowId, Arc<Mutex<()>>>>>,
    countdown: Arc<AtomicI64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Arc::new(StdMutex::new(MemoryState::default())),
            list_locks: Arc::new(StdMutex::new(HashMap::new())),
            countdown: Arc::new(AtomicI64::new(0)),
        }
    }

    pub async fn add_list(&self) -> Uuid {
        let mut state = self.committed();
        let id = state.next_id();
        let uuid = Uuid::new_v4();
        state.lists.insert(id, uuid);
        uuid
    }

    pub async fn add_item(&self) -> Uuid {
        let mut state = self.committed();
        let id = state.next_id();
        let uuid = Uuid::new_v4();
        state.items.insert(id, uuid);
        uuid
    }

    /// Deletes a list together with its list items, waiting for its lock first.
    pub async fn delete_list(&self, list: Uuid) -> bool {
        let list_id = match self.committed().lists.iter().find(|(_, uuid)| **uuid == list) {
            Some((id, _)) => *id,
            None => return false,
        };
        let _lock = self.list_lock(list_id).lock_owned().await;

        let mut state = self.committed();
        if state.lists.remove(&list_id).is_none() {
            return false;
        }
        state.list_items.retain(|_, row| row.list_id != list_id);
        true
    }

    /// Makes the `statement`-th statement from now on fail, counting from 1.
    pub fn fail_at_statement(&self, statement: i64) {
        self.countdown.store(statement, Ordering::SeqCst);
    }

    fn committed(&self) -> MutexGuard<'_, MemoryState> {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn list_lock(&self, list_id: RowId) -> Arc<Mutex<()>> {
        self.list_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(list_id)
            .or_default()
            .clone()
    }

    fn next_id(&self) -> RowId {
        self.committed().next_id()
    }
}

#[async_trait::async_trait]
impl ListStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn begin(&self) -> OrderingResult<MemoryTransaction> {
        Ok(MemoryTransaction {
            store: self.clone(),
            locks: HashMap::new(),
            written: BTreeMap::new(),
        })
    }
}

pub struct MemoryTransaction {
    store: MemoryStore,
    locks: HashMap<RowId, OwnedMutexGuard<()>>,
    /// Rows changed by this transaction, `None` for deleted ones.
    written: BTreeMap<RowId, Option<ListItem>>,
}

impl MemoryTransaction {
    /// Counts one statement, failing it when the injected countdown runs out.
    async fn statement(&self) -> OrderingResult<()> {
        tokio::task::yield_now().await;
        if self.store.countdown.fetch_sub(1, Ordering::SeqCst) == 1 {
            warn!("failing statement on request");
            return Err(OrderingError::StoreUnavailable(
                "injected statement failure".to_string(),
            ));
        }
        Ok(())
    }

    /// The committed state with this transaction's own writes applied.
    fn view(&self) -> MemoryState {
        let mut state = self.store.committed().clone();
        state.apply(&self.written);
        state
    }

    /// Runs `change` against the current view and keeps the rows it changed.
    fn write<T>(
        &mut self,
        change: impl FnOnce(&mut MemoryState) -> OrderingResult<T>,
    ) -> OrderingResult<T> {
        let before = self.view();
        let mut after = before.clone();
        let output = change(&mut after)?;

        let ids: BTreeSet<RowId> = before
            .list_items
            .keys()
            .chain(after.list_items.keys())
            .copied()
            .collect();
        let mut changed = Vec::new();
        for id in ids {
            let old = before.list_items.get(&id);
            let new = after.list_items.get(&id);
            if old == new {
                continue;
            }
            for list_id in old.iter().chain(new.iter()).map(|row| row.list_id) {
                if !self.locks.contains_key(&list_id) {
                    error!("list '{}' written without holding its lock", list_id);
                    return Err(OrderingError::StoreUnavailable(format!(
                        "list {} is not locked by this transaction",
                        list_id
                    )));
                }
            }
            changed.push((id, new.cloned()));
        }
        self.written.extend(changed);
        Ok(output)
    }
}

#[async_trait::async_trait]
impl ListTransaction for MemoryTransaction {
    async fn find_list(&mut self, list: Uuid) -> OrderingResult<Option<RowId>> {
        self.statement().await?;
        Ok(self
            .view()
            .lists
            .iter()
            .find(|(_, uuid)| **uuid == list)
            .map(|(id, _)| *id))
    }

    async fn find_item(&mut self, item: Uuid) -> OrderingResult<Option<RowId>> {
        self.statement().await?;
        Ok(self
            .view()
            .items
            .iter()
            .find(|(_, uuid)| **uuid == item)
            .map(|(id, _)| *id))
    }

    async fn find_list_item(&mut self, list_item: Uuid) -> OrderingResult<Option<ListItem>> {
        self.statement().await?;
        Ok(self
            .view()
            .list_items
            .values()
            .find(|row| row.uuid == list_item)
            .cloned())
    }

    async fn lock_list(&mut self, list_id: RowId) -> OrderingResult<bool> {
        self.statement().await?;
        if !self.locks.contains_key(&list_id) {
            let guard = self.store.list_lock(list_id).lock_owned().await;
            self.locks.insert(list_id, guard);
        }
        Ok(self.store.committed().lists.contains_key(&list_id))
    }

    async fn count(&mut self, list_id: RowId) -> OrderingResult<i32> {
        self.statement().await?;
        Ok(self
            .view()
            .list_items
            .values()
            .filter(|row| row.list_id == list_id)
            .count() as i32)
    }

    async fn id_at(&mut self, list_id: RowId, position: i32) -> OrderingResult<Option<RowId>> {
        self.statement().await?;
        Ok(self
            .view()
            .list_items
            .values()
            .find(|row| row.list_id == list_id && row.position == position)
            .map(|row| row.list_item_id))
    }

    async fn shift(
        &mut self,
        list_id: RowId,
        positions: RangeInclusive<i32>,
        delta: i32,
    ) -> OrderingResult<u64> {
        self.statement().await?;
        self.write(|state| {
            let mut shifted = 0;
            for row in state.list_items.values_mut() {
                if row.list_id == list_id && positions.contains(&row.position) {
                    row.position += delta;
                    shifted += 1;
                }
            }
            Ok(shifted)
        })
    }

    async fn insert(&mut self, item_id: RowId, placement: Placement) -> OrderingResult<RowId> {
        self.statement().await?;
        let id = self.store.next_id();
        self.write(|state| {
            if !state.items.contains_key(&item_id) || !state.lists.contains_key(&placement.list_id)
            {
                return Err(OrderingError::ConflictRetryable);
            }
            let row = ListItem::new(
                id,
                Uuid::new_v4(),
                placement.list_id,
                item_id,
                placement.position,
                placement.prev,
                placement.next,
                OffsetDateTime::now_utc(),
            );
            state.list_items.insert(id, row);
            Ok(id)
        })
    }

    async fn set_prev(&mut self, list_item_id: RowId, prev: Option<RowId>) -> OrderingResult<()> {
        self.statement().await?;
        self.write(|state| {
            state.row_mut(list_item_id)?.prev_item_id = prev;
            Ok(())
        })
    }

    async fn set_next(&mut self, list_item_id: RowId, next: Option<RowId>) -> OrderingResult<()> {
        self.statement().await?;
        self.write(|state| {
            state.row_mut(list_item_id)?.next_item_id = next;
            Ok(())
        })
    }

    async fn place(&mut self, list_item_id: RowId, placement: Placement) -> OrderingResult<()> {
        self.statement().await?;
        self.write(|state| {
            let row = state.row_mut(list_item_id)?;
            row.list_id = placement.list_id;
            row.position = placement.position;
            row.prev_item_id = placement.prev;
            row.next_item_id = placement.next;
            Ok(())
        })
    }

    async fn delete(&mut self, list_item_id: RowId) -> OrderingResult<bool> {
        self.statement().await?;
        self.write(|state| {
            if state.list_items.remove(&list_item_id).is_none() {
                return Ok(false);
            }
            // ON DELETE SET NULL
            for row in state.list_items.values_mut() {
                if row.prev_item_id == Some(list_item_id) {
                    row.prev_item_id = None;
                }
                if row.next_item_id == Some(list_item_id) {
                    row.next_item_id = None;
                }
            }
            Ok(true)
        })
    }

    async fn record(&mut self, list_item_id: RowId) -> OrderingResult<ListItemRecord> {
        self.statement().await?;
        let state = self.view();
        let row = state
            .list_items
            .get(&list_item_id)
            .ok_or(OrderingError::NotFound(Entity::ListItem))?;
        state.record(row)
    }

    async fn records(
        &mut self,
        list_id: RowId,
        offset: i64,
        limit: i64,
    ) -> OrderingResult<Vec<ListItemRecord>> {
        self.statement().await?;
        let state = self.view();
        let mut rows: Vec<&ListItem> = state
            .list_items
            .values()
            .filter(|row| row.list_id == list_id)
            .collect();
        rows.sort_by_key(|row| row.position);
        rows.into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|row| state.record(row))
            .collect()
    }

    async fn commit(self) -> OrderingResult<()> {
        let mut committed = self.store.committed();
        let mut state = committed.clone();
        state.apply(&self.written);
        state.check_positions()?;
        *committed = state;
        Ok(())
    }
}
