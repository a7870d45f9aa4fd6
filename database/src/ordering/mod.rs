//! The ordered list engine.
//!
//! Every list keeps its list items in two representations at once: a dense,
//! zero-based `position` column and a doubly linked chain of `prev`/`next`
//! row references. [`OrderedList`] is the only code that mutates either of
//! them, and it always updates both inside one store transaction.
//!
//! Callers address list items by position only. Internal row ids never leave
//! this module; [`ListItemRecord`] carries public uuids.

use sqlx::types::time::OffsetDateTime;
use std::{error::Error, fmt::Display};
use uuid::Uuid;

mod engine;
#[cfg(any(test, feature = "memory"))]
mod memory;
mod postgres;
mod store;

pub use engine::{ListPage, OrderedList};
#[cfg(any(test, feature = "memory"))]
pub use memory::{MemoryStore, MemoryTransaction};
pub use postgres::PgListTransaction;
pub use store::{ListStore, ListTransaction};

/// Internal primary key of a row.
pub type RowId = i64;

pub type OrderingResult<T> = Result<T, OrderingError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    List,
    Item,
    ListItem,
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let output = match self {
            Entity::List => "list",
            Entity::Item => "item",
            Entity::ListItem => "list item",
        };
        write!(f, "{}", output)
    }
}

/// Failure of an engine operation. An operation that fails is never partially applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderingError {
    NotFound(Entity),
    InvalidPosition { position: i32, len: i32 },
    /// Lost a race against a concurrent operation; safe to retry.
    ConflictRetryable,
    StoreUnavailable(String),
}

impl Display for OrderingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderingError::NotFound(entity) => write!(f, "{} does not exist", entity),
            OrderingError::InvalidPosition { position, len } => write!(
                f,
                "position '{}' is out of range for a list of length '{}'",
                position, len
            ),
            OrderingError::ConflictRetryable => {
                write!(f, "conflicting concurrent modification, try again")
            }
            OrderingError::StoreUnavailable(context) => write!(f, "store unavailable: {}", context),
        }
    }
}

impl Error for OrderingError {}

impl From<sqlx::Error> for OrderingError {
    fn from(sqlx_error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &sqlx_error {
            if let Some(code) = db_error.code() {
                if is_retryable_sqlstate(&code) {
                    warn!("retryable database error '{}': {}", code, db_error);
                    return OrderingError::ConflictRetryable;
                }
            }
        }
        OrderingError::StoreUnavailable(sqlx_error.to_string())
    }
}

/// serialization_failure, deadlock_detected, unique_violation, foreign_key_violation
fn is_retryable_sqlstate(code: &str) -> bool {
    matches!(code, "40001" | "40P01" | "23505" | "23503")
}

/// Where a list item sits: its list, position and neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub list_id: RowId,
    pub position: i32,
    pub prev: Option<RowId>,
    pub next: Option<RowId>,
}

impl Placement {
    pub fn new(list_id: RowId, position: i32, prev: Option<RowId>, next: Option<RowId>) -> Self {
        Self {
            list_id,
            position,
            prev,
            next,
        }
    }

    /// Out of the position range and out of the chain, while a move is in progress.
    pub(crate) fn detached(list_id: RowId) -> Self {
        Self::new(list_id, -1, None, None)
    }
}

/// A list item as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[non_exhaustive]
pub struct ListItemRecord {
    pub uuid: Uuid,
    pub list_uuid: Uuid,
    pub item_uuid: Uuid,
    pub position: i32,
    pub prev_uuid: Option<Uuid>,
    pub next_uuid: Option<Uuid>,
    pub status_uuid: Option<Uuid>,
    pub created_date: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainViolation {
    MixedLists { position: i32 },
    PositionGap { expected: i32, found: i32 },
    SelfReference { position: i32 },
    HeadHasPrev,
    TailHasNext,
    BrokenLink { position: i32 },
}

impl Display for ChainViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainViolation::MixedLists { position } => {
                write!(f, "record at '{}' belongs to another list", position)
            }
            ChainViolation::PositionGap { expected, found } => {
                write!(f, "expected position '{}', found '{}'", expected, found)
            }
            ChainViolation::SelfReference { position } => {
                write!(f, "record at '{}' references itself", position)
            }
            ChainViolation::HeadHasPrev => write!(f, "head of the list has a prev reference"),
            ChainViolation::TailHasNext => write!(f, "tail of the list has a next reference"),
            ChainViolation::BrokenLink { position } => write!(
                f,
                "records at '{}' and '{}' are not linked to each other",
                position,
                position + 1
            ),
        }
    }
}

impl Error for ChainViolation {}

/// Checks a whole list, ordered by position, for density and a matching prev/next chain.
pub fn validate_chain(records: &[ListItemRecord]) -> Result<(), ChainViolation> {
    let (first, last) = match (records.first(), records.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Ok(()),
    };

    for (index, record) in records.iter().enumerate() {
        let expected = index as i32;
        if record.list_uuid != first.list_uuid {
            return Err(ChainViolation::MixedLists {
                position: record.position,
            });
        }
        if record.position != expected {
            return Err(ChainViolation::PositionGap {
                expected,
                found: record.position,
            });
        }
        if record.prev_uuid == Some(record.uuid) || record.next_uuid == Some(record.uuid) {
            return Err(ChainViolation::SelfReference { position: expected });
        }
    }

    if first.prev_uuid.is_some() {
        return Err(ChainViolation::HeadHasPrev);
    }
    if last.next_uuid.is_some() {
        return Err(ChainViolation::TailHasNext);
    }

    for pair in records.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.next_uuid != Some(b.uuid) || b.prev_uuid != Some(a.uuid) {
            return Err(ChainViolation::BrokenLink {
                position: a.position,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(list: Uuid, len: usize) -> Vec<ListItemRecord> {
        let ids: Vec<Uuid> = (0..len).map(|_| Uuid::new_v4()).collect();
        (0..len)
            .map(|i| ListItemRecord {
                uuid: ids[i],
                list_uuid: list,
                item_uuid: Uuid::new_v4(),
                position: i as i32,
                prev_uuid: if i == 0 { None } else { Some(ids[i - 1]) },
                next_uuid: ids.get(i + 1).copied(),
                status_uuid: None,
                created_date: OffsetDateTime::now_utc(),
            })
            .collect()
    }

    #[test]
    fn valid_chains() {
        let list = Uuid::new_v4();
        assert_eq!(validate_chain(&[]), Ok(()));
        assert_eq!(validate_chain(&chain(list, 1)), Ok(()));
        assert_eq!(validate_chain(&chain(list, 5)), Ok(()));
    }

    #[test]
    fn gap_in_positions() {
        let mut records = chain(Uuid::new_v4(), 3);
        records[2].position = 3;
        assert_eq!(
            validate_chain(&records),
            Err(ChainViolation::PositionGap {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn dangling_tail() {
        let mut records = chain(Uuid::new_v4(), 2);
        records[1].next_uuid = Some(Uuid::new_v4());
        assert_eq!(validate_chain(&records), Err(ChainViolation::TailHasNext));
    }

    #[test]
    fn head_with_prev() {
        let mut records = chain(Uuid::new_v4(), 2);
        records[0].prev_uuid = Some(records[1].uuid);
        assert_eq!(validate_chain(&records), Err(ChainViolation::HeadHasPrev));
    }

    #[test]
    fn one_sided_link() {
        let mut records = chain(Uuid::new_v4(), 3);
        records[2].prev_uuid = Some(records[0].uuid);
        assert_eq!(
            validate_chain(&records),
            Err(ChainViolation::BrokenLink { position: 1 })
        );
    }

    #[test]
    fn self_reference() {
        let mut records = chain(Uuid::new_v4(), 3);
        records[1].next_uuid = Some(records[1].uuid);
        assert_eq!(
            validate_chain(&records),
            Err(ChainViolation::SelfReference { position: 1 })
        );
    }

    #[test]
    fn retryable_sqlstates() {
        for code in &["40001", "40P01", "23505", "23503"] {
            assert!(is_retryable_sqlstate(code));
        }
        assert!(!is_retryable_sqlstate("42P01"));
    }

    #[test]
    fn non_database_errors_are_unavailable() {
        assert!(matches!(
            OrderingError::from(sqlx::Error::PoolTimedOut),
            OrderingError::StoreUnavailable(_)
        ));
    }
}
