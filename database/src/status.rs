use crate::{ordering::RowId, Database, DatabaseResult};
use sqlx::{types::time::OffsetDateTime, FromRow};
use uuid::Uuid;

pub type StatusDatabase = Database<Status>;

/// The status seeded for every new user.
pub const DEFAULT_STATUS: &str = "backlog";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct Status {
    pub status_id: RowId,
    pub uuid: Uuid,
    pub label: String,
    pub user_id: Option<RowId>,
    pub created_date: OffsetDateTime,
}

impl StatusDatabase {
    /// Adds a status owned by `user`. `None` if there is no such user.
    pub async fn insert_status(&self, label: &str, user: Uuid) -> DatabaseResult<Option<Status>> {
        let mut db = self.get_connection().await?;

        let status = sqlx::query_as::<_, Status>(
            r#"
            INSERT INTO statuses (label, user_id)
            SELECT $1, user_id FROM users WHERE uuid = $2
            RETURNING status_id, uuid, label, user_id, created_date"#,
        )
        .bind(label)
        .bind(user)
        .fetch_optional(&mut *db)
        .await?;

        Ok(status)
    }

    /// Sets or clears the status of a list item. `false` if the list item does
    /// not exist, or if the status is neither shared nor owned by `user`.
    ///
    /// The status is a plain column; position and links are untouched.
    pub async fn set_list_item_status(
        &self,
        list_item: Uuid,
        status: Option<Uuid>,
        user: Uuid,
    ) -> DatabaseResult<bool> {
        let mut db = self.get_connection().await?;

        let query_result = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    UPDATE list_items
                    SET status_id = s.status_id
                    FROM statuses s
                    WHERE list_items.uuid = $1
                      AND s.uuid = $2
                      AND (s.user_id IS NULL
                           OR s.user_id = (SELECT user_id FROM users WHERE uuid = $3))"#,
                )
                .bind(list_item)
                .bind(status)
                .bind(user)
                .execute(&mut *db)
                .await?
            }
            None => {
                sqlx::query("UPDATE list_items SET status_id = NULL WHERE uuid = $1")
                    .bind(list_item)
                    .execute(&mut *db)
                    .await?
            }
        };

        Ok(query_result.rows_affected() == 1)
    }
}
