use crate::{status::DEFAULT_STATUS, Database, DatabaseResult, InsertionResult};
use sqlx::{types::time::OffsetDateTime, FromRow};
use uuid::Uuid;

pub type UserDatabase = Database<User>;

/// The list seeded for every new user.
pub const DEFAULT_LIST: &str = "Watchlist";

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct User {
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub superuser: bool,
    pub created_date: OffsetDateTime,
}

/// What a token is issued for, as read at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct UserClaimsRow {
    pub uuid: Uuid,
    pub superuser: bool,
}

impl UserDatabase {
    /// Creates a user together with a default list and a default status.
    ///
    /// Returns `AlreadyExists` when the username or the email is taken.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> DatabaseResult<InsertionResult<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, (i64, Uuid)>(
            r#"
            INSERT INTO users (username, email, hashed_password)
            VALUES ($1, $2, crypt($3, gen_salt('bf')))
            ON CONFLICT DO NOTHING
            RETURNING user_id, uuid"#,
        )
        .bind(username)
        .bind(email)
        .bind(password)
        .fetch_optional(&mut *tx)
        .await?;

        let (user_id, uuid) = match InsertionResult::from_returned(inserted) {
            InsertionResult::Inserted(row) => row,
            InsertionResult::AlreadyExists => {
                info!("user '{}' or email '{}' is already taken", username, email);
                return Ok(InsertionResult::AlreadyExists);
            }
        };

        sqlx::query("INSERT INTO lists (name, user_id) VALUES ($1, $2)")
            .bind(DEFAULT_LIST)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO statuses (label, user_id) VALUES ($1, $2)")
            .bind(DEFAULT_STATUS)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(InsertionResult::Inserted(uuid))
    }

    /// Checks a password against the user with `login` as username or email.
    pub async fn validate_user(
        &self,
        login: &str,
        password: &str,
    ) -> DatabaseResult<Option<UserClaimsRow>> {
        let mut db = self.get_connection().await?;

        let mut query_result = sqlx::query_as::<_, UserClaimsRow>(
            r#"
            SELECT uuid, superuser FROM users
            WHERE (username = $1 OR email = $1)
              AND hashed_password = crypt($2, hashed_password)"#,
        )
        .bind(login)
        .bind(password)
        .fetch_all(&mut *db)
        .await?;

        if query_result.is_empty() {
            Ok(None)
        } else if query_result.len() > 1 {
            error!("more than 1 user with login '{}'", login);
            Ok(None)
        } else {
            Ok(Some(query_result.remove(0)))
        }
    }

    pub async fn get_user(&self, uuid: Uuid) -> DatabaseResult<Option<User>> {
        let mut db = self.get_connection().await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT uuid, username, email, superuser, created_date FROM users WHERE uuid = $1",
        )
        .bind(uuid)
        .fetch_optional(&mut *db)
        .await?;

        Ok(user)
    }
}
