pub mod models;
pub mod db;
pub mod repositories;

pub use sqlx;

pub use db::{connect, connect_in_memory};
pub use models::license::License;
pub use repositories::license_repo::LicenseRepository;
