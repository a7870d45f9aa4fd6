pub mod add_status;
