//! Persistence layer for the forms backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations of the domain storage ports
//! - SQL migrations under `src/migrations`

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
