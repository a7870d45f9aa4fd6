pub mod get_token;
pub mod get_user;
pub mod logout;
pub mod refresh_token;
pub mod register_user;
