//! Infrastructure layer for external integrations.
//!
//! This layer implements the contracts defined in [`crate::domain`].
//!
//! # Modules
//!
//! - [`store`] - Counter and session stores (Redis and in-memory implementations)
//! - [`persistence`] - PostgreSQL liveness probe

pub mod persistence;
pub mod store;
