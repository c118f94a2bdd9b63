//! # Recipe Shared Library
//!
//! This crate contains the data layer and authentication primitives used by
//! the recipe API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their SQL operations
//! - `auth`: Password hashing, JWT tokens and the request auth context
//! - `db`: Connection pool and migrations
//! - `media`: Image path generation and media storage

pub mod auth;
pub mod db;
pub mod media;
pub mod models;

/// Current version of the recipe shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
