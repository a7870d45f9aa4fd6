use super::{
    ListItemRecord, ListStore, ListTransaction, OrderingError, OrderingResult, Placement, RowId,
};
use crate::{Database, ListItem};
use sqlx::{Postgres, Transaction};
use std::{convert::TryFrom, ops::RangeInclusive};
use uuid::Uuid;

const RECORD_SELECT: &str = r#"
    SELECT li.uuid, l.uuid AS list_uuid, i.uuid AS item_uuid, li.position,
           p.uuid AS prev_uuid, n.uuid AS next_uuid, s.uuid AS status_uuid, li.created_date
    FROM list_items li
    JOIN lists l ON l.list_id = li.list_id
    JOIN items i ON i.item_id = li.item_id
    LEFT JOIN list_items p ON p.list_item_id = li.prev_item_id
    LEFT JOIN list_items n ON n.list_item_id = li.next_item_id
    LEFT JOIN statuses s ON s.status_id = li.status_id"#;

#[async_trait::async_trait]
impl ListStore for Database<ListItem> {
    type Transaction = PgListTransaction;

    async fn begin(&self) -> OrderingResult<PgListTransaction> {
        let tx = self.pool.begin().await?;
        Ok(PgListTransaction { tx })
    }
}

/// An open Postgres transaction. Rolled back when dropped without commit.
pub struct PgListTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl ListTransaction for PgListTransaction {
    async fn find_list(&mut self, list: Uuid) -> OrderingResult<Option<RowId>> {
        let list_id = sqlx::query_scalar::<_, RowId>("SELECT list_id FROM lists WHERE uuid = $1")
            .bind(list)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(list_id)
    }

    async fn find_item(&mut self, item: Uuid) -> OrderingResult<Option<RowId>> {
        let item_id = sqlx::query_scalar::<_, RowId>("SELECT item_id FROM items WHERE uuid = $1")
            .bind(item)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(item_id)
    }

    async fn find_list_item(&mut self, list_item: Uuid) -> OrderingResult<Option<ListItem>> {
        let row = sqlx::query_as::<_, ListItem>(
            r#"
            SELECT list_item_id, uuid, list_id, item_id, position,
                   prev_item_id, next_item_id, status_id, created_date
            FROM list_items
            WHERE uuid = $1"#,
        )
        .bind(list_item)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn lock_list(&mut self, list_id: RowId) -> OrderingResult<bool> {
        let locked =
            sqlx::query_scalar::<_, RowId>("SELECT list_id FROM lists WHERE list_id = $1 FOR UPDATE")
                .bind(list_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(locked.is_some())
    }

    async fn count(&mut self, list_id: RowId) -> OrderingResult<i32> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM list_items WHERE list_id = $1")
                .bind(list_id)
                .fetch_one(&mut *self.tx)
                .await?;
        i32::try_from(count).map_err(|_| {
            OrderingError::StoreUnavailable(format!(
                "list '{}' holds more than i32::MAX items",
                list_id
            ))
        })
    }

    async fn id_at(&mut self, list_id: RowId, position: i32) -> OrderingResult<Option<RowId>> {
        let list_item_id = sqlx::query_scalar::<_, RowId>(
            "SELECT list_item_id FROM list_items WHERE list_id = $1 AND position = $2",
        )
        .bind(list_id)
        .bind(position)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(list_item_id)
    }

    async fn shift(
        &mut self,
        list_id: RowId,
        positions: RangeInclusive<i32>,
        delta: i32,
    ) -> OrderingResult<u64> {
        let query_result = sqlx::query(
            r#"
            UPDATE list_items SET position = position + $4
            WHERE list_id = $1 AND position >= $2 AND position <= $3"#,
        )
        .bind(list_id)
        .bind(*positions.start())
        .bind(*positions.end())
        .bind(delta)
        .execute(&mut *self.tx)
        .await?;
        Ok(query_result.rows_affected())
    }

    async fn insert(&mut self, item_id: RowId, placement: Placement) -> OrderingResult<RowId> {
        let list_item_id = sqlx::query_scalar::<_, RowId>(
            r#"
            INSERT INTO list_items (list_id, item_id, position, prev_item_id, next_item_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING list_item_id"#,
        )
        .bind(placement.list_id)
        .bind(item_id)
        .bind(placement.position)
        .bind(placement.prev)
        .bind(placement.next)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(list_item_id)
    }

    async fn set_prev(&mut self, list_item_id: RowId, prev: Option<RowId>) -> OrderingResult<()> {
        sqlx::query("UPDATE list_items SET prev_item_id = $2 WHERE list_item_id = $1")
            .bind(list_item_id)
            .bind(prev)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn set_next(&mut self, list_item_id: RowId, next: Option<RowId>) -> OrderingResult<()> {
        sqlx::query("UPDATE list_items SET next_item_id = $2 WHERE list_item_id = $1")
            .bind(list_item_id)
            .bind(next)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn place(&mut self, list_item_id: RowId, placement: Placement) -> OrderingResult<()> {
        sqlx::query(
            r#"
            UPDATE list_items
            SET list_id = $2, position = $3, prev_item_id = $4, next_item_id = $5
            WHERE list_item_id = $1"#,
        )
        .bind(list_item_id)
        .bind(placement.list_id)
        .bind(placement.position)
        .bind(placement.prev)
        .bind(placement.next)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete(&mut self, list_item_id: RowId) -> OrderingResult<bool> {
        let query_result = sqlx::query("DELETE FROM list_items WHERE list_item_id = $1")
            .bind(list_item_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(query_result.rows_affected() == 1)
    }

    async fn record(&mut self, list_item_id: RowId) -> OrderingResult<ListItemRecord> {
        let query = format!("{} WHERE li.list_item_id = $1", RECORD_SELECT);
        let record = sqlx::query_as::<_, ListItemRecord>(&query)
            .bind(list_item_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(record)
    }

    async fn records(
        &mut self,
        list_id: RowId,
        offset: i64,
        limit: i64,
    ) -> OrderingResult<Vec<ListItemRecord>> {
        let query = format!(
            "{} WHERE li.list_id = $1 ORDER BY li.position OFFSET $2 LIMIT $3",
            RECORD_SELECT
        );
        let records = sqlx::query_as::<_, ListItemRecord>(&query)
            .bind(list_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(records)
    }

    async fn commit(self) -> OrderingResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

// Run with a scratch database: `KANBAN_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::{validate_chain, OrderedList};
    use sqlx::PgPool;

    async fn engine() -> (PgPool, OrderedList<Database<ListItem>>) {
        let addr = std::env::var("KANBAN_TEST_DATABASE_URL").unwrap();
        let pool = crate::connect(&addr, 5).await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        (pool.clone(), OrderedList::new(Database::new(pool)))
    }

    async fn seeded_list(pool: &PgPool, items: usize) -> (Uuid, Vec<Uuid>) {
        let username = format!("ordering-{}", Uuid::new_v4());
        let user_id = sqlx::query_scalar::<_, RowId>(
            r#"INSERT INTO users (username, email, hashed_password)
               VALUES ($1, $1, 'x') RETURNING user_id"#,
        )
        .bind(&username)
        .fetch_one(pool)
        .await
        .unwrap();
        let list = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO lists (name, user_id) VALUES ('test', $1) RETURNING uuid",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
        let mut item_uuids = Vec::new();
        for i in 0..items {
            let item = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO items (title) VALUES ($1) RETURNING uuid",
            )
            .bind(format!("movie {}", i))
            .fetch_one(pool)
            .await
            .unwrap();
            item_uuids.push(item);
        }
        (list, item_uuids)
    }

    async fn contents(engine: &OrderedList<Database<ListItem>>, list: Uuid) -> Vec<Uuid> {
        let page = engine.list_items(list, 0, i64::MAX).await.unwrap();
        validate_chain(&page.records).unwrap();
        page.records.into_iter().map(|r| r.item_uuid).collect()
    }

    #[tokio::test]
    #[ignore]
    async fn insert_move_and_remove() {
        let (pool, engine) = engine().await;
        let (list, items) = seeded_list(&pool, 3).await;

        let a = engine.insert(list, items[0], 0).await.unwrap();
        engine.insert(list, items[1], 1).await.unwrap();
        engine.insert(list, items[2], 1).await.unwrap();
        assert_eq!(contents(&engine, list).await, vec![items[0], items[2], items[1]]);

        engine.move_within_list(a.uuid, 2).await.unwrap();
        assert_eq!(contents(&engine, list).await, vec![items[2], items[1], items[0]]);

        engine.remove(a.uuid).await.unwrap();
        assert_eq!(contents(&engine, list).await, vec![items[2], items[1]]);
    }

    #[tokio::test]
    #[ignore]
    async fn move_between_lists() {
        let (pool, engine) = engine().await;
        let (source, items) = seeded_list(&pool, 2).await;
        let (target, _) = seeded_list(&pool, 0).await;

        engine.insert(source, items[0], 0).await.unwrap();
        let b = engine.insert(source, items[1], 1).await.unwrap();

        let moved = engine.move_to_list(b.uuid, target, 0).await.unwrap();

        assert_eq!(moved.uuid, b.uuid);
        assert_eq!(contents(&engine, source).await, vec![items[0]]);
        assert_eq!(contents(&engine, target).await, vec![items[1]]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore]
    async fn concurrent_inserts_are_serialized() {
        let (pool, engine) = engine().await;
        let (list, items) = seeded_list(&pool, 10).await;

        let handles: Vec<_> = items
            .iter()
            .map(|item| {
                let engine = engine.clone();
                let item = *item;
                tokio::spawn(async move { engine.insert(list, item, 0).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut stored = contents(&engine, list).await;
        stored.sort();
        let mut expected = items.clone();
        expected.sort();
        assert_eq!(stored, expected);
    }
}
