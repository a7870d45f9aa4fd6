use sqlx::{pool::PoolConnection, postgres::PgPoolOptions, Postgres};
use std::{error::Error, fmt::Display, marker::PhantomData, time::Instant};

#[macro_use]
extern crate log;

mod item;
mod list;
mod list_item;
pub mod ordering;
mod status;
mod token;
mod user;

pub use item::*;
pub use list::*;
pub use list_item::*;
pub use status::*;
pub use token::*;
pub use user::*;

pub use sqlx::postgres::PgPool;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Opens a connection pool against the Postgres instance at `addr`.
pub async fn connect(addr: &str, max_connections: u32) -> DatabaseResult<PgPool> {
    trace!("connecting to database");
    let timer = Instant::now();
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(addr)
        .await?;
    info!("connected to database in {:?}", timer.elapsed());
    Ok(pool)
}

/// Brings the schema up to date.
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Queries for rows of type `T`, sharing one connection pool between all row types.
pub struct Database<T> {
    pool: PgPool,
    _phantom: PhantomData<T>,
}

impl<T> Database<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    async fn get_connection(&self) -> DatabaseResult<PoolConnection<Postgres>> {
        let timer = Instant::now();
        let conn = self.pool.acquire().await?;
        trace!("acquired database connection in {:?}", timer.elapsed());
        Ok(conn)
    }
}

impl<T> Clone for Database<T> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

#[derive(Debug)]
pub enum DatabaseError {
    SqlxError(sqlx::Error),
    MigrateError(sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(sqlx_error: sqlx::Error) -> Self {
        DatabaseError::SqlxError(sqlx_error)
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(migrate_error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrateError(migrate_error)
    }
}

impl Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            DatabaseError::SqlxError(e) => e.to_string(),
            DatabaseError::MigrateError(e) => format!("migration failed: {}", e),
        };

        write!(f, "{}", output)
    }
}

impl Error for DatabaseError {}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionResult<T> {
    Inserted(T),
    AlreadyExists,
}

impl<T> InsertionResult<T> {
    pub(crate) fn from_returned(returned: Option<T>) -> Self {
        match returned {
            Some(value) => Self::Inserted(value),
            None => Self::AlreadyExists,
        }
    }
}
