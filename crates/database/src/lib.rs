//! # Field Forms Database Crate
//!
//! This crate is the persistence and authorization layer for treatment forms.
//! It owns every read and write against the `forms`, `shrub_details`,
//! `pesticide_details` and `pesticide_applications` tables.
//!
//! ## Architectural Principles
//!
//! - **Ownership as predicate:** every owned-row statement filters on the
//!   caller's id inside the statement itself. Absent and foreign forms both
//!   surface as [`DbError::NotFoundOrUnauthorized`].
//! - **Two layers of integrity:** type consistency is checked when a request
//!   is validated and again by triggers in the schema, which also freeze the
//!   discriminator and own the timestamps.
//! - **Asynchronous & Pooled:** all operations are asynchronous, run under a
//!   deadline, and draw connections from a bounded `PgPool`.
//!
//! ## Public API
//!
//! - `connect` / `run_migrations`: pool construction and the embedded schema.
//! - `FormsRepository`: create, read, update, delete and list operations.
//! - `DbError` / `ErrorKind`: the failure taxonomy returned by this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
mod rows;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, pool_options, run_migrations};
pub use error::{DbError, ErrorKind};
pub use repository::{FormsRepository, DEFAULT_OPERATION_TIMEOUT};
