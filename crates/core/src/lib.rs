//! Riffhouse Core - Shared domain types.
//!
//! This crate provides the types used across all Riffhouse components:
//! - `storefront` - Catalog, cart and checkout HTTP service
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. The `postgres` feature adds `sqlx` encoding so the
//! storefront can bind these types directly.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, quantities, emails and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
