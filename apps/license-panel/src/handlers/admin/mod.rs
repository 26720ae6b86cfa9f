// Admin Module
pub mod auth;
pub mod licenses;

pub use auth::{get_login, login, logout};
pub use licenses::{dashboard, create_license, toggle_license, delete_license};
