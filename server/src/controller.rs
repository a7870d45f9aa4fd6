pub use item::ItemController;
pub use list::ListController;
pub use list_item::ListItemController;
pub use status::StatusController;
pub use user::UserController;

mod item;
mod list;
mod list_item;
mod status;
mod user;
