use crate::ordering::RowId;
use sqlx::{types::time::OffsetDateTime, FromRow};
use uuid::Uuid;

/// A `list_items` row as stored, with internal ids.
///
/// Outward facing code never sees this type; the ordering engine hands out
/// [`ListItemRecord`](crate::ordering::ListItemRecord) values instead.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
#[non_exhaustive]
pub struct ListItem {
    pub list_item_id: RowId,
    pub uuid: Uuid,
    pub list_id: RowId,
    pub item_id: RowId,
    pub position: i32,
    pub prev_item_id: Option<RowId>,
    pub next_item_id: Option<RowId>,
    pub status_id: Option<RowId>,
    pub created_date: OffsetDateTime,
}

impl ListItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        list_item_id: RowId,
        uuid: Uuid,
        list_id: RowId,
        item_id: RowId,
        position: i32,
        prev_item_id: Option<RowId>,
        next_item_id: Option<RowId>,
        created_date: OffsetDateTime,
    ) -> Self {
        Self {
            list_item_id,
            uuid,
            list_id,
            item_id,
            position,
            prev_item_id,
            next_item_id,
            status_id: None,
            created_date,
        }
    }
}
