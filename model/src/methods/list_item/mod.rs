use uuid::Uuid;

pub mod add_list_item;
pub mod get_list_items;
pub mod move_list_item;
pub mod move_list_item_to_list;
pub mod remove_list_item;
pub mod set_list_item_status;

/// One item's placement within one list.
#[derive(serde::Serialize, Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[non_exhaustive]
pub struct ListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub item_id: Uuid,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<Uuid>,
}

impl ListItem {
    pub fn new(
        id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
        position: i32,
        prev_id: Option<Uuid>,
        next_id: Option<Uuid>,
        status_id: Option<Uuid>,
    ) -> Self {
        Self {
            id,
            list_id,
            item_id,
            position,
            prev_id,
            next_id,
            status_id,
        }
    }
}

/// Result of every method that places a list item somewhere.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[non_exhaustive]
pub struct PlacementResult {
    pub list_item: ListItem,
}

impl PlacementResult {
    pub fn new(list_item: ListItem) -> Self {
        Self { list_item }
    }
}
