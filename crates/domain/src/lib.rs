//! Domain layer for the forms backend.
//!
//! This crate contains:
//! - Domain models (FormSchema, FormSubmission, typed submission documents)
//! - Storage ports and their in-memory implementations
//! - Business logic services
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
pub mod store;
