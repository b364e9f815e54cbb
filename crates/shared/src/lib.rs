//! Shared utilities and common types for the forms backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Slug generation and content hashing
//! - Bearer token validation for the identity collaborator
//! - Reusable validator functions

pub mod crypto;
pub mod jwt;
pub mod validation;
