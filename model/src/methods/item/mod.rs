pub mod add_item;
