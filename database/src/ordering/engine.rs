use super::{
    validate_chain, Entity, ListItemRecord, ListStore, ListTransaction, OrderingError,
    OrderingResult, Placement, RowId,
};
use crate::ListItem;
use std::time::Instant;
use uuid::Uuid;

/// One page of a list, ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub records: Vec<ListItemRecord>,
    pub total: i64,
}

/// Position based operations on ordered lists, each run as one transaction of `S`.
#[derive(Debug, Clone)]
pub struct OrderedList<S> {
    store: S,
}

impl<S> OrderedList<S>
where
    S: ListStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places `item` into `list` so that it ends up at `position`, shifting later items back.
    pub async fn insert(
        &self,
        list: Uuid,
        item: Uuid,
        position: i32,
    ) -> OrderingResult<ListItemRecord> {
        let timer = Instant::now();
        let mut tx = self.store.begin().await?;

        let list_id = tx
            .find_list(list)
            .await?
            .ok_or(OrderingError::NotFound(Entity::List))?;
        if !tx.lock_list(list_id).await? {
            return Err(OrderingError::NotFound(Entity::List));
        }
        let item_id = tx
            .find_item(item)
            .await?
            .ok_or(OrderingError::NotFound(Entity::Item))?;

        let len = tx.count(list_id).await?;
        check_position(position, 0..=len, len)?;

        let (prev, next) = neighbours_before_gap(&mut tx, list_id, position).await?;
        tx.shift(list_id, position..=i32::MAX, 1).await?;
        let list_item_id = tx
            .insert(item_id, Placement::new(list_id, position, prev, next))
            .await?;
        link(&mut tx, prev, list_item_id, next).await?;

        let record = tx.record(list_item_id).await?;
        debug_check(&mut tx, list_id).await?;
        tx.commit().await?;

        info!(
            "inserted item '{}' into list '{}' at position '{}' in {:?}",
            item,
            list,
            position,
            timer.elapsed()
        );
        Ok(record)
    }

    /// Takes a list item out of its list and closes the gap it leaves.
    pub async fn remove(&self, list_item: Uuid) -> OrderingResult<()> {
        let timer = Instant::now();
        let mut tx = self.store.begin().await?;

        let row = locked_list_item(&mut tx, list_item).await?;
        unlink(&mut tx, &row).await?;
        if !tx.delete(row.list_item_id).await? {
            return Err(OrderingError::NotFound(Entity::ListItem));
        }
        tx.shift(row.list_id, (row.position + 1)..=i32::MAX, -1)
            .await?;

        debug_check(&mut tx, row.list_id).await?;
        tx.commit().await?;

        info!(
            "removed list item '{}' from position '{}' in {:?}",
            list_item,
            row.position,
            timer.elapsed()
        );
        Ok(())
    }

    /// Moves a list item to `position` within its own list.
    pub async fn move_within_list(
        &self,
        list_item: Uuid,
        position: i32,
    ) -> OrderingResult<ListItemRecord> {
        let timer = Instant::now();
        let mut tx = self.store.begin().await?;

        let row = locked_list_item(&mut tx, list_item).await?;
        let record = reorder(&mut tx, &row, position).await?;
        tx.commit().await?;

        info!(
            "moved list item '{}' from position '{}' to '{}' in {:?}",
            list_item,
            row.position,
            position,
            timer.elapsed()
        );
        Ok(record)
    }

    /// Moves a list item into `list` at `position`, keeping its identity.
    ///
    /// Moving into the list the item is already in is the same as [`move_within_list`](Self::move_within_list).
    pub async fn move_to_list(
        &self,
        list_item: Uuid,
        list: Uuid,
        position: i32,
    ) -> OrderingResult<ListItemRecord> {
        let timer = Instant::now();
        let mut tx = self.store.begin().await?;

        let unlocked = tx
            .find_list_item(list_item)
            .await?
            .ok_or(OrderingError::NotFound(Entity::ListItem))?;
        let target_id = tx
            .find_list(list)
            .await?
            .ok_or(OrderingError::NotFound(Entity::List))?;

        // both lists, always in the same order
        let source_id = unlocked.list_id;
        for list_id in lock_order(source_id, target_id) {
            if !tx.lock_list(list_id).await? {
                let entity = if list_id == target_id {
                    Entity::List
                } else {
                    Entity::ListItem
                };
                return Err(OrderingError::NotFound(entity));
            }
        }
        let row = tx
            .find_list_item(list_item)
            .await?
            .ok_or(OrderingError::NotFound(Entity::ListItem))?;
        if row.list_id != source_id {
            warn!(
                "list item '{}' changed list while waiting for locks",
                list_item
            );
            return Err(OrderingError::ConflictRetryable);
        }

        let record = if source_id == target_id {
            reorder(&mut tx, &row, position).await?
        } else {
            transfer(&mut tx, &row, target_id, position).await?
        };
        tx.commit().await?;

        info!(
            "moved list item '{}' to list '{}' at position '{}' in {:?}",
            list_item,
            list,
            position,
            timer.elapsed()
        );
        Ok(record)
    }

    /// Reads `limit` list items starting at `offset`, ordered by position.
    pub async fn list_items(&self, list: Uuid, offset: i64, limit: i64) -> OrderingResult<ListPage> {
        let mut tx = self.store.begin().await?;

        let list_id = tx
            .find_list(list)
            .await?
            .ok_or(OrderingError::NotFound(Entity::List))?;
        let total = i64::from(tx.count(list_id).await?);
        let records = tx.records(list_id, offset, limit).await?;
        tx.commit().await?;

        Ok(ListPage { records, total })
    }
}

fn check_position(
    position: i32,
    valid: std::ops::RangeInclusive<i32>,
    len: i32,
) -> OrderingResult<()> {
    if valid.contains(&position) {
        Ok(())
    } else {
        Err(OrderingError::InvalidPosition { position, len })
    }
}

fn lock_order(a: RowId, b: RowId) -> Vec<RowId> {
    let mut ids = vec![a, b];
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Moves the locked `row` to `position` within its list.
async fn reorder<T>(tx: &mut T, row: &ListItem, position: i32) -> OrderingResult<ListItemRecord>
where
    T: ListTransaction,
{
    let len = tx.count(row.list_id).await?;
    check_position(position, 0..=(len - 1), len)?;

    let current = row.position;
    if position == current {
        trace!(
            "list item '{}' is already at position '{}'",
            row.uuid,
            position
        );
        return tx.record(row.list_item_id).await;
    }

    detach(tx, row).await?;
    if position < current {
        tx.shift(row.list_id, position..=(current - 1), 1).await?;
    } else {
        tx.shift(row.list_id, (current + 1)..=position, -1).await?;
    }
    let (prev, next) = neighbours_around_gap(tx, row.list_id, position).await?;
    tx.place(
        row.list_item_id,
        Placement::new(row.list_id, position, prev, next),
    )
    .await?;
    link(tx, prev, row.list_item_id, next).await?;

    let record = tx.record(row.list_item_id).await?;
    debug_check(tx, row.list_id).await?;
    Ok(record)
}

/// Moves the locked `row` out of its list and into `target_id` at `position`.
async fn transfer<T>(
    tx: &mut T,
    row: &ListItem,
    target_id: RowId,
    position: i32,
) -> OrderingResult<ListItemRecord>
where
    T: ListTransaction,
{
    let target_len = tx.count(target_id).await?;
    check_position(position, 0..=target_len, target_len)?;

    detach(tx, row).await?;
    tx.shift(row.list_id, (row.position + 1)..=i32::MAX, -1)
        .await?;

    let (prev, next) = neighbours_before_gap(tx, target_id, position).await?;
    tx.shift(target_id, position..=i32::MAX, 1).await?;
    tx.place(
        row.list_item_id,
        Placement::new(target_id, position, prev, next),
    )
    .await?;
    link(tx, prev, row.list_item_id, next).await?;

    let record = tx.record(row.list_item_id).await?;
    debug_check(tx, row.list_id).await?;
    debug_check(tx, target_id).await?;
    Ok(record)
}

/// Reads a list item, locks its list, then reads it again under the lock.
async fn locked_list_item<T>(tx: &mut T, list_item: Uuid) -> OrderingResult<ListItem>
where
    T: ListTransaction,
{
    let unlocked = tx
        .find_list_item(list_item)
        .await?
        .ok_or(OrderingError::NotFound(Entity::ListItem))?;
    if !tx.lock_list(unlocked.list_id).await? {
        return Err(OrderingError::NotFound(Entity::ListItem));
    }
    let row = tx
        .find_list_item(list_item)
        .await?
        .ok_or(OrderingError::NotFound(Entity::ListItem))?;
    if row.list_id != unlocked.list_id {
        warn!(
            "list item '{}' changed list while waiting for lock",
            list_item
        );
        return Err(OrderingError::ConflictRetryable);
    }
    Ok(row)
}

/// Occupants of `position - 1` and `position`, before a gap is opened at `position`.
async fn neighbours_before_gap<T>(
    tx: &mut T,
    list_id: RowId,
    position: i32,
) -> OrderingResult<(Option<RowId>, Option<RowId>)>
where
    T: ListTransaction,
{
    let prev = if position > 0 {
        tx.id_at(list_id, position - 1).await?
    } else {
        None
    };
    let next = tx.id_at(list_id, position).await?;
    Ok((prev, next))
}

/// Occupants of `position - 1` and `position + 1`, once `position` itself is free.
async fn neighbours_around_gap<T>(
    tx: &mut T,
    list_id: RowId,
    position: i32,
) -> OrderingResult<(Option<RowId>, Option<RowId>)>
where
    T: ListTransaction,
{
    let prev = if position > 0 {
        tx.id_at(list_id, position - 1).await?
    } else {
        None
    };
    let next = tx.id_at(list_id, position + 1).await?;
    Ok((prev, next))
}

async fn link<T>(
    tx: &mut T,
    prev: Option<RowId>,
    list_item_id: RowId,
    next: Option<RowId>,
) -> OrderingResult<()>
where
    T: ListTransaction,
{
    if let Some(prev) = prev {
        tx.set_next(prev, Some(list_item_id)).await?;
    }
    if let Some(next) = next {
        tx.set_prev(next, Some(list_item_id)).await?;
    }
    Ok(())
}

/// Joins the neighbours of `row` to each other.
async fn unlink<T>(tx: &mut T, row: &ListItem) -> OrderingResult<()>
where
    T: ListTransaction,
{
    if let Some(prev) = row.prev_item_id {
        tx.set_next(prev, row.next_item_id).await?;
    }
    if let Some(next) = row.next_item_id {
        tx.set_prev(next, row.prev_item_id).await?;
    }
    Ok(())
}

async fn detach<T>(tx: &mut T, row: &ListItem) -> OrderingResult<()>
where
    T: ListTransaction,
{
    unlink(tx, row).await?;
    tx.place(row.list_item_id, Placement::detached(row.list_id))
        .await
}

/// With debug logging on, reads the whole list back and fails on a broken chain.
async fn debug_check<T>(tx: &mut T, list_id: RowId) -> OrderingResult<()>
where
    T: ListTransaction,
{
    if !log_enabled!(log::Level::Debug) {
        return Ok(());
    }
    let records = tx.records(list_id, 0, i64::MAX).await?;
    check_chain(list_id, &records)?;
    debug!("list '{}' is consistent ({} items)", list_id, records.len());
    Ok(())
}

fn check_chain(list_id: RowId, records: &[ListItemRecord]) -> OrderingResult<()> {
    validate_chain(records).map_err(|violation| {
        error!("list '{}' is inconsistent: {}", list_id, violation);
        OrderingError::StoreUnavailable(format!("list {} is inconsistent: {}", list_id, violation))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::MemoryStore;
    use proptest::prelude::*;
    use rstest::rstest;

    async fn contents(engine: &OrderedList<MemoryStore>, list: Uuid) -> Vec<ListItemRecord> {
        let page = engine.list_items(list, 0, i64::MAX).await.unwrap();
        validate_chain(&page.records).unwrap();
        assert_eq!(page.total, page.records.len() as i64);
        page.records
    }

    fn items_of(records: &[ListItemRecord]) -> Vec<Uuid> {
        records.iter().map(|r| r.item_uuid).collect()
    }

    /// A list holding `len` fresh items, in order.
    async fn filled(engine: &OrderedList<MemoryStore>, len: usize) -> (Uuid, Vec<Uuid>) {
        let list = engine.store().add_list().await;
        let mut items = Vec::new();
        for position in 0..len {
            let item = engine.store().add_item().await;
            engine.insert(list, item, position as i32).await.unwrap();
            items.push(item);
        }
        (list, items)
    }

    #[tokio::test]
    async fn insert_into_empty_list() {
        let engine = OrderedList::new(MemoryStore::new());
        let list = engine.store().add_list().await;
        let item = engine.store().add_item().await;

        let record = engine.insert(list, item, 0).await.unwrap();

        assert_eq!(record.position, 0);
        assert_eq!(record.prev_uuid, None);
        assert_eq!(record.next_uuid, None);
        assert_eq!(record.list_uuid, list);
        assert_eq!(contents(&engine, list).await, vec![record]);
    }

    #[tokio::test]
    async fn insert_in_the_middle() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 2).await;
        let c = engine.store().add_item().await;

        let inserted = engine.insert(list, c, 1).await.unwrap();

        let records = contents(&engine, list).await;
        assert_eq!(items_of(&records), vec![items[0], c, items[1]]);
        assert_eq!(records[0].next_uuid, Some(inserted.uuid));
        assert_eq!(inserted.prev_uuid, Some(records[0].uuid));
        assert_eq!(inserted.next_uuid, Some(records[2].uuid));
        assert_eq!(records[2].prev_uuid, Some(inserted.uuid));
        assert_eq!(records[2].position, 2);
    }

    #[tokio::test]
    async fn insert_at_the_end() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 3).await;
        let d = engine.store().add_item().await;

        let record = engine.insert(list, d, 3).await.unwrap();

        assert_eq!(record.next_uuid, None);
        let records = contents(&engine, list).await;
        assert_eq!(items_of(&records), vec![items[0], items[1], items[2], d]);
    }

    #[tokio::test]
    async fn same_item_may_appear_twice() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 1).await;

        engine.insert(list, items[0], 0).await.unwrap();

        assert_eq!(
            items_of(&contents(&engine, list).await),
            vec![items[0], items[0]]
        );
    }

    #[tokio::test]
    async fn remove_from_the_middle() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 3).await;
        let before = contents(&engine, list).await;

        engine.remove(before[1].uuid).await.unwrap();

        let after = contents(&engine, list).await;
        assert_eq!(items_of(&after), vec![items[0], items[2]]);
        assert_eq!(after[0].next_uuid, Some(after[1].uuid));
        assert_eq!(after[1].prev_uuid, Some(after[0].uuid));
        assert_eq!(after[1].position, 1);
        assert!(after.iter().all(|r| r.uuid != before[1].uuid));
    }

    #[tokio::test]
    async fn remove_twice_is_not_found() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 2).await;
        let head = contents(&engine, list).await[0].uuid;

        engine.remove(head).await.unwrap();

        assert_eq!(
            engine.remove(head).await,
            Err(OrderingError::NotFound(Entity::ListItem))
        );
        assert_eq!(contents(&engine, list).await.len(), 1);
    }

    #[tokio::test]
    async fn move_to_same_position_changes_nothing() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 3).await;
        let before = contents(&engine, list).await;

        let record = engine.move_within_list(before[1].uuid, 1).await.unwrap();

        assert_eq!(record, before[1]);
        assert_eq!(contents(&engine, list).await, before);
    }

    #[rstest]
    #[case::head_to_tail(0, 3, vec![1, 2, 3, 0])]
    #[case::tail_to_head(3, 0, vec![3, 0, 1, 2])]
    #[case::one_forward(1, 2, vec![0, 2, 1, 3])]
    #[case::one_backward(2, 1, vec![0, 2, 1, 3])]
    #[case::middle_to_head(2, 0, vec![2, 0, 1, 3])]
    #[tokio::test]
    async fn move_within_list(#[case] from: usize, #[case] to: i32, #[case] expected: Vec<usize>) {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 4).await;
        let before = contents(&engine, list).await;

        let record = engine.move_within_list(before[from].uuid, to).await.unwrap();

        assert_eq!(record.uuid, before[from].uuid);
        assert_eq!(record.position, to);
        let expected: Vec<Uuid> = expected.into_iter().map(|i| items[i]).collect();
        assert_eq!(items_of(&contents(&engine, list).await), expected);
    }

    #[tokio::test]
    async fn move_to_another_list() {
        let engine = OrderedList::new(MemoryStore::new());
        let (source, source_items) = filled(&engine, 2).await;
        let (target, target_items) = filled(&engine, 1).await;
        let b = contents(&engine, source).await[1].clone();

        let moved = engine.move_to_list(b.uuid, target, 0).await.unwrap();

        assert_eq!(moved.uuid, b.uuid);
        assert_eq!(moved.list_uuid, target);
        let source_records = contents(&engine, source).await;
        assert_eq!(items_of(&source_records), vec![source_items[0]]);
        assert_eq!(source_records[0].next_uuid, None);
        let target_records = contents(&engine, target).await;
        assert_eq!(
            items_of(&target_records),
            vec![source_items[1], target_items[0]]
        );
        assert_eq!(target_records[0].next_uuid, Some(target_records[1].uuid));
        assert_eq!(target_records[1].prev_uuid, Some(b.uuid));
    }

    #[tokio::test]
    async fn move_to_own_list_is_a_move_within() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 3).await;
        let head = contents(&engine, list).await[0].uuid;

        let record = engine.move_to_list(head, list, 2).await.unwrap();

        assert_eq!(record.position, 2);
        assert_eq!(
            items_of(&contents(&engine, list).await),
            vec![items[1], items[2], items[0]]
        );
    }

    #[tokio::test]
    async fn move_into_empty_list() {
        let engine = OrderedList::new(MemoryStore::new());
        let (source, _) = filled(&engine, 1).await;
        let target = engine.store().add_list().await;
        let only = contents(&engine, source).await[0].uuid;

        let record = engine.move_to_list(only, target, 0).await.unwrap();

        assert_eq!((record.prev_uuid, record.next_uuid), (None, None));
        assert!(contents(&engine, source).await.is_empty());
        assert_eq!(contents(&engine, target).await, vec![record]);
    }

    #[rstest]
    #[case::negative(-1)]
    #[case::past_the_end(4)]
    #[tokio::test]
    async fn insert_out_of_range(#[case] position: i32) {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 3).await;
        let before = contents(&engine, list).await;
        let item = engine.store().add_item().await;

        assert_eq!(
            engine.insert(list, item, position).await,
            Err(OrderingError::InvalidPosition { position, len: 3 })
        );
        assert_eq!(contents(&engine, list).await, before);
    }

    #[rstest]
    #[case::negative(-1)]
    #[case::at_length(3)]
    #[tokio::test]
    async fn move_within_out_of_range(#[case] position: i32) {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 3).await;
        let before = contents(&engine, list).await;

        assert_eq!(
            engine.move_within_list(before[0].uuid, position).await,
            Err(OrderingError::InvalidPosition { position, len: 3 })
        );
        assert_eq!(contents(&engine, list).await, before);
    }

    #[tokio::test]
    async fn move_to_list_out_of_range() {
        let engine = OrderedList::new(MemoryStore::new());
        let (source, _) = filled(&engine, 2).await;
        let (target, _) = filled(&engine, 1).await;
        let before = contents(&engine, source).await;

        assert_eq!(
            engine.move_to_list(before[0].uuid, target, 2).await,
            Err(OrderingError::InvalidPosition {
                position: 2,
                len: 1
            })
        );
        assert_eq!(contents(&engine, source).await, before);
    }

    #[tokio::test]
    async fn missing_entities() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 1).await;

        assert_eq!(
            engine.insert(Uuid::new_v4(), items[0], 0).await,
            Err(OrderingError::NotFound(Entity::List))
        );
        assert_eq!(
            engine.insert(list, Uuid::new_v4(), 0).await,
            Err(OrderingError::NotFound(Entity::Item))
        );
        assert_eq!(
            engine.move_within_list(Uuid::new_v4(), 0).await,
            Err(OrderingError::NotFound(Entity::ListItem))
        );
        let head = contents(&engine, list).await[0].uuid;
        assert_eq!(
            engine.move_to_list(head, Uuid::new_v4(), 0).await,
            Err(OrderingError::NotFound(Entity::List))
        );
        assert_eq!(
            engine.list_items(Uuid::new_v4(), 0, 10).await,
            Err(OrderingError::NotFound(Entity::List))
        );
    }

    #[tokio::test]
    async fn deleting_a_list_deletes_its_items() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 2).await;
        let head = contents(&engine, list).await[0].uuid;

        assert!(engine.store().delete_list(list).await);

        assert_eq!(
            engine.remove(head).await,
            Err(OrderingError::NotFound(Entity::ListItem))
        );
    }

    #[tokio::test]
    async fn paging() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, items) = filled(&engine, 5).await;

        let page = engine.list_items(list, 2, 2).await.unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(items_of(&page.records), vec![items[2], items[3]]);
        assert_eq!(page.records[0].position, 2);
    }

    #[rstest]
    #[case::first_lookup(1)]
    #[case::while_detaching(8)]
    #[case::while_linking(16)]
    #[case::reading_the_result(17)]
    #[tokio::test]
    async fn failing_statement_rolls_back(#[case] statement: i64) {
        let engine = OrderedList::new(MemoryStore::new());
        let (source, _) = filled(&engine, 3).await;
        let (target, _) = filled(&engine, 2).await;
        let source_before = contents(&engine, source).await;
        let target_before = contents(&engine, target).await;

        engine.store().fail_at_statement(statement);
        let result = engine.move_to_list(source_before[1].uuid, target, 1).await;

        assert!(matches!(result, Err(OrderingError::StoreUnavailable(_))));
        assert_eq!(contents(&engine, source).await, source_before);
        assert_eq!(contents(&engine, target).await, target_before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_inserts_into_the_same_list() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 2).await;
        let x = engine.store().add_item().await;
        let y = engine.store().add_item().await;

        let handles: Vec<_> = vec![x, y]
            .into_iter()
            .map(|item| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.insert(list, item, 1).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = contents(&engine, list).await;
        assert_eq!(records.len(), 4);
        let middle = items_of(&records[1..3]);
        assert!(middle == vec![x, y] || middle == vec![y, x]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cross_list_move_alongside_an_insert() {
        let engine = OrderedList::new(MemoryStore::new());
        let (source, source_items) = filled(&engine, 3).await;
        let (target, target_items) = filled(&engine, 2).await;
        let moved = contents(&engine, source).await[0].uuid;
        let fresh = engine.store().add_item().await;

        let mover = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.move_to_list(moved, target, 1).await })
        };
        let inserter = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.insert(target, fresh, 0).await })
        };
        mover.await.unwrap().unwrap();
        inserter.await.unwrap().unwrap();

        assert_eq!(
            items_of(&contents(&engine, source).await),
            vec![source_items[1], source_items[2]]
        );
        let target_order = items_of(&contents(&engine, target).await);
        let insert_first = vec![fresh, source_items[0], target_items[0], target_items[1]];
        let move_first = vec![fresh, target_items[0], source_items[0], target_items[1]];
        assert!(target_order == insert_first || target_order == move_first);
    }

    #[tokio::test]
    async fn move_into_a_list_the_item_has_just_left() {
        let engine = OrderedList::new(MemoryStore::new());
        let (home, _) = filled(&engine, 2).await;
        let (away, _) = filled(&engine, 1).await;
        let x = contents(&engine, home).await[0].uuid;

        // hold the home list so both moves queue up behind it
        let mut holder = engine.store().begin().await.unwrap();
        let home_id = holder.find_list(home).await.unwrap().unwrap();
        assert!(holder.lock_list(home_id).await.unwrap());

        let elsewhere = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.move_to_list(x, away, 0).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let back_home = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.move_to_list(x, home, 1).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(holder);

        assert_eq!(elsewhere.await.unwrap().unwrap().list_uuid, away);
        assert_eq!(
            back_home.await.unwrap(),
            Err(OrderingError::ConflictRetryable)
        );
        assert_eq!(contents(&engine, away).await[0].uuid, x);
        assert_eq!(contents(&engine, home).await.len(), 1);
    }

    #[tokio::test]
    async fn broken_chain_fails_the_check() {
        let engine = OrderedList::new(MemoryStore::new());
        let (list, _) = filled(&engine, 3).await;
        let mut records = contents(&engine, list).await;
        assert_eq!(check_chain(1, &records), Ok(()));

        records[2].prev_uuid = Some(records[0].uuid);

        assert!(matches!(
            check_chain(1, &records),
            Err(OrderingError::StoreUnavailable(_))
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert { list: usize, position: i32 },
        Remove { list: usize, index: usize },
        Move { list: usize, index: usize, position: i32 },
        Transfer { from: usize, index: usize, to: usize, position: i32 },
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..3usize, 0..8i32).prop_map(|(list, position)| Op::Insert { list, position }),
            (0..3usize, 0..8usize).prop_map(|(list, index)| Op::Remove { list, index }),
            (0..3usize, 0..8usize, 0..8i32)
                .prop_map(|(list, index, position)| Op::Move { list, index, position }),
            (0..3usize, 0..8usize, 0..3usize, 0..8i32).prop_map(|(from, index, to, position)| {
                Op::Transfer {
                    from,
                    index,
                    to,
                    position,
                }
            }),
        ]
    }

    async fn apply(
        engine: &OrderedList<MemoryStore>,
        lists: &[Uuid],
        model: &mut [Vec<Uuid>],
        op: Op,
    ) {
        match op {
            Op::Insert { list, position } => {
                let item = engine.store().add_item().await;
                let result = engine.insert(lists[list], item, position).await;
                if position as usize <= model[list].len() {
                    result.unwrap();
                    model[list].insert(position as usize, item);
                } else {
                    assert!(matches!(result, Err(OrderingError::InvalidPosition { .. })));
                }
            }
            Op::Remove { list, index } => {
                let records = contents(engine, lists[list]).await;
                if let Some(record) = records.get(index) {
                    engine.remove(record.uuid).await.unwrap();
                    model[list].remove(index);
                }
            }
            Op::Move {
                list,
                index,
                position,
            } => {
                let records = contents(engine, lists[list]).await;
                if let Some(record) = records.get(index) {
                    let result = engine.move_within_list(record.uuid, position).await;
                    if (position as usize) < model[list].len() {
                        result.unwrap();
                        let item = model[list].remove(index);
                        model[list].insert(position as usize, item);
                    } else {
                        assert!(matches!(result, Err(OrderingError::InvalidPosition { .. })));
                    }
                }
            }
            Op::Transfer {
                from,
                index,
                to,
                position,
            } => {
                let records = contents(engine, lists[from]).await;
                if let Some(record) = records.get(index) {
                    let result = engine.move_to_list(record.uuid, lists[to], position).await;
                    let limit = if from == to {
                        model[to].len() - 1
                    } else {
                        model[to].len()
                    };
                    if position as usize <= limit {
                        result.unwrap();
                        let item = model[from].remove(index);
                        model[to].insert(position as usize, item);
                    } else {
                        assert!(matches!(result, Err(OrderingError::InvalidPosition { .. })));
                    }
                }
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn random_operations_keep_lists_consistent(ops in proptest::collection::vec(op(), 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let engine = OrderedList::new(MemoryStore::new());
                let mut lists = Vec::new();
                for _ in 0..3 {
                    lists.push(engine.store().add_list().await);
                }
                let mut model = vec![Vec::new(); 3];

                for op in ops {
                    apply(&engine, &lists, &mut model, op).await;
                    for (list, expected) in lists.iter().zip(&model) {
                        assert_eq!(&items_of(&contents(&engine, *list).await), expected);
                    }
                }
            });
        }
    }
}
