/// Catalog gRPC service implementation.
pub mod catalog;

/// Authentication gRPC service implementation.
pub mod auth;

pub use auth::AuthServiceImpl;
pub use catalog::CatalogServiceImpl;
