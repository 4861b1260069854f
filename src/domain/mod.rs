// Domain module - data model and error types
pub mod error;
pub mod profile;
