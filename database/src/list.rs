use crate::{ordering::RowId, Database, DatabaseResult};
use sqlx::{types::time::OffsetDateTime, FromRow};
use uuid::Uuid;

pub type ListDatabase = Database<List>;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct List {
    pub list_id: RowId,
    pub uuid: Uuid,
    pub name: String,
    pub user_id: RowId,
    pub created_date: OffsetDateTime,
}

impl ListDatabase {
    /// Adds a list owned by `user`. `None` if there is no such user.
    pub async fn insert_list(&self, name: &str, user: Uuid) -> DatabaseResult<Option<List>> {
        let mut db = self.get_connection().await?;

        let list = sqlx::query_as::<_, List>(
            r#"
            INSERT INTO lists (name, user_id)
            SELECT $1, user_id FROM users WHERE uuid = $2
            RETURNING list_id, uuid, name, user_id, created_date"#,
        )
        .bind(name)
        .bind(user)
        .fetch_optional(&mut *db)
        .await?;

        Ok(list)
    }

    pub async fn get_lists_for_user(&self, user: Uuid) -> DatabaseResult<Vec<List>> {
        let mut db = self.get_connection().await?;

        let lists = sqlx::query_as::<_, List>(
            r#"
            SELECT l.list_id, l.uuid, l.name, l.user_id, l.created_date
            FROM lists l
            JOIN users u ON u.user_id = l.user_id
            WHERE u.uuid = $1
            ORDER BY l.created_date, l.list_id"#,
        )
        .bind(user)
        .fetch_all(&mut *db)
        .await?;

        Ok(lists)
    }

    /// Deletes a list owned by `user` and, through the cascade, every list item in it.
    ///
    /// `false` if there is no such list or it belongs to someone else.
    pub async fn delete_list(&self, list: Uuid, user: Uuid) -> DatabaseResult<bool> {
        let mut db = self.get_connection().await?;

        let query_result = sqlx::query(
            r#"
            DELETE FROM lists l
            USING users u
            WHERE l.user_id = u.user_id AND l.uuid = $1 AND u.uuid = $2"#,
        )
        .bind(list)
        .bind(user)
        .execute(&mut *db)
        .await?;

        Ok(query_result.rows_affected() == 1)
    }
}
