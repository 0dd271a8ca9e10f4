//! PostgreSQL integrations.
//!
//! The service keeps no relational data of its own; the pool is used only to
//! report database liveness on the health endpoint.

mod pg_probe;

pub use pg_probe::PgProbe;
