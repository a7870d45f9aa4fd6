pub mod item;
pub mod list;
pub mod list_item;
pub mod status;
pub mod user;
