//! Anonymous image hosting gateway backed by an S3-compatible object store

#![deny(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
#![warn(missing_docs)]

/// Random image identifiers
pub mod image_id;

/// Object store seam and its S3 implementation
pub mod object_store;

/// HTTP routes
pub mod routes;

/// Server assembly and startup
pub mod server;

/// Configuration, errors and extractors
pub mod types;
