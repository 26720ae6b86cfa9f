pub mod license_repo;
