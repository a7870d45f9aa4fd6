use crate::{ordering::RowId, Database, DatabaseResult};
use sqlx::{types::time::OffsetDateTime, FromRow};

pub type ItemDatabase = Database<Item>;

/// A movie in the catalog. Items are shared; any number of lists may hold the same item.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct Item {
    pub item_id: RowId,
    pub uuid: uuid::Uuid,
    pub title: String,
    pub created_date: OffsetDateTime,
}

impl ItemDatabase {
    pub async fn insert_item(&self, title: &str) -> DatabaseResult<Item> {
        let mut db = self.get_connection().await?;

        let item = sqlx::query_as::<_, Item>(
            "INSERT INTO items (title) VALUES ($1) RETURNING item_id, uuid, title, created_date",
        )
        .bind(title)
        .fetch_one(&mut *db)
        .await?;

        Ok(item)
    }
}
