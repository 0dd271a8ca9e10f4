//! PostgreSQL liveness probe.

use crate::domain::probe::DatabaseProbe;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

/// Runs `SELECT 1` against the pool.
pub struct PgProbe {
    pool: Arc<PgPool>,
}

impl PgProbe {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DatabaseProbe for PgProbe {
    async fn ping(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
