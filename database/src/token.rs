use crate::{user::UserClaimsRow, Database, DatabaseResult};
use sqlx::{types::time::OffsetDateTime, FromRow};
use uuid::Uuid;

pub type RefreshTokenDatabase = Database<RefreshToken>;

/// How long a refresh token stays valid.
pub const REFRESH_TOKEN_DAYS: i32 = 7;

/// An opaque token that can be traded for a new access token until it expires or is revoked.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct RefreshToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

impl RefreshTokenDatabase {
    /// Issues a new refresh token for `user`. `None` if there is no such user.
    pub async fn insert_refresh_token(&self, user: Uuid) -> DatabaseResult<Option<RefreshToken>> {
        let mut db = self.get_connection().await?;

        let token = sqlx::query_as::<_, RefreshToken>(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at)
            SELECT user_id, encode(gen_random_bytes(32), 'hex'), now() + make_interval(days => $2)
            FROM users WHERE uuid = $1
            RETURNING token, expires_at"#,
        )
        .bind(user)
        .bind(REFRESH_TOKEN_DAYS)
        .fetch_optional(&mut *db)
        .await?;

        Ok(token)
    }

    /// The user behind an unexpired refresh token.
    pub async fn validate_refresh_token(&self, token: &str) -> DatabaseResult<Option<UserClaimsRow>> {
        let mut db = self.get_connection().await?;

        let claims = sqlx::query_as::<_, UserClaimsRow>(
            r#"
            SELECT u.uuid, u.superuser
            FROM refresh_tokens t
            JOIN users u ON u.user_id = t.user_id
            WHERE t.token = $1 AND t.expires_at > now()"#,
        )
        .bind(token)
        .fetch_optional(&mut *db)
        .await?;

        Ok(claims)
    }

    /// Revokes a refresh token issued to `user`. `false` if there was none.
    pub async fn delete_refresh_token(&self, token: &str, user: Uuid) -> DatabaseResult<bool> {
        let mut db = self.get_connection().await?;

        let query_result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens t
            USING users u
            WHERE t.user_id = u.user_id AND t.token = $1 AND u.uuid = $2"#,
        )
        .bind(token)
        .bind(user)
        .execute(&mut *db)
        .await?;

        Ok(query_result.rows_affected() == 1)
    }
}
