pub mod license_service;
