pub mod add_list;
pub mod delete_list;
pub mod get_lists;
