//! Laptop catalog gRPC service.
//!
//! Clients create, search, rate, and attach images to laptop records over
//! unary and streaming RPC. Every call passes through a role-based access
//! policy backed by HMAC-signed bearer tokens before it reaches a handler.

/// Token issuance, verification, and method-level access control.
pub mod auth;
/// Server configuration loading and validation.
pub mod config;
/// Error taxonomy and gRPC status mapping.
pub mod error;
/// Filter predicate evaluation over the wire types.
pub mod model;
/// gRPC service implementations.
pub mod service;
/// Concurrent record, rating, and image stores.
pub mod store;

/// Generated protobuf/gRPC types for the `catalog` package.
pub mod proto {
    tonic::include_proto!("catalog");
}

pub use config::ServerConfig;
pub use error::{Error, Result};
