//! # ReviewDesk Shared Library
//!
//! Types, persistence and the request authorization resolver used by the
//! ReviewDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and queries
//! - `db`: connection pool and migrations
//! - `store`: store traits with PostgreSQL and in-memory implementations
//! - `auth`: credential, identity, tenant and privilege resolution

pub mod auth;
pub mod db;
pub mod models;
pub mod store;

/// Current version of the ReviewDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
