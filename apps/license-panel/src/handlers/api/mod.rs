pub mod validate;

pub use validate::{validate_license, validate_preflight};
