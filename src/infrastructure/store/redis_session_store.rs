//! Redis-backed session storage.

use crate::domain::session::SessionData;
use crate::domain::stores::{SessionStore, StoreError, StoreResult};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

/// Stores each session as a JSON document under `session:<id>` with a sliding TTL.
pub struct RedisSessionStore {
    client: ConnectionManager,
    ttl_seconds: u64,
    key_prefix: String,
}

impl RedisSessionStore {
    pub fn new(client: ConnectionManager, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds,
            key_prefix: "session:".to_string(),
        }
    }

    fn build_key(&self, id: &str) -> String {
        format!("{}{}", self.key_prefix, id)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, id: &str) -> StoreResult<Option<SessionData>> {
        let key = self.build_key(id);
        let mut conn = self.client.clone();

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Operation(format!("GET {}: {}", key, e)))?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| StoreError::Operation(format!("Corrupt session {}: {}", key, e)))
        })
        .transpose()
    }

    async fn save(&self, id: &str, data: &SessionData) -> StoreResult<()> {
        let key = self.build_key(id);
        let mut conn = self.client.clone();

        let json = serde_json::to_string(data)
            .map_err(|e| StoreError::Operation(format!("Encode session {}: {}", key, e)))?;

        conn.set_ex::<_, _, ()>(&key, json, self.ttl_seconds)
            .await
            .map_err(|e| StoreError::Operation(format!("SETEX {}: {}", key, e)))
    }
}
