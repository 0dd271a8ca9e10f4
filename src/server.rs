//! HTTP server initialization and runtime setup.
//!
//! Handles store and database connections, limiter construction, and the Axum
//! server lifecycle.

use crate::application::services::{
    CsrfGuard, DefensePipeline, RateLimitPolicy, RateLimiter,
};
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::probe::DatabaseProbe;
use crate::domain::stores::{CounterStore, SessionStore};
use crate::infrastructure::persistence::PgProbe;
use crate::infrastructure::store::{
    MemoryCounterStore, MemorySessionStore, RedisCounterStore, RedisSessionStore, connect_redis,
};
use crate::routes::app_router;
use crate::state::{AppState, HttpSettings};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use axum::http::HeaderName;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Counter and session store pair sharing one backend.
type Stores = (Arc<dyn CounterStore>, Arc<dyn SessionStore>);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Redis-backed stores (or in-memory fallback)
/// - Optional PostgreSQL pool for the health probe
/// - Global and contact rate limiters
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - A configured value cannot be turned into a runtime component
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let (counter_store, session_store) = connect_stores(&config, clock.clone()).await;

    let database: Option<Arc<dyn DatabaseProbe>> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(2))
                .connect_lazy(url)
                .context("Invalid DATABASE_URL")?;
            tracing::info!("Database health probe enabled");
            Some(Arc::new(PgProbe::new(Arc::new(pool))))
        }
        None => None,
    };

    let state = build_state(&config, counter_store, session_store, database, clock)?;

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wires limiters, the CSRF guard and the pipeline into an [`AppState`].
///
/// # Errors
///
/// Returns an error if `csrf_header` is not a valid header name.
pub fn build_state(
    config: &Config,
    counter_store: Arc<dyn CounterStore>,
    session_store: Arc<dyn SessionStore>,
    database: Option<Arc<dyn DatabaseProbe>>,
    clock: Arc<dyn Clock>,
) -> Result<AppState> {
    let store_timeout = Duration::from_millis(config.store_timeout_ms);

    let global_limiter = RateLimiter::new(
        counter_store.clone(),
        clock.clone(),
        RateLimitPolicy::new(config.rate_limit_window_ms, config.rate_limit_max),
    )
    .with_store_timeout(store_timeout);

    let contact_limiter = RateLimiter::new(
        counter_store.clone(),
        clock,
        RateLimitPolicy::new(config.rate_limit_window_ms, config.contact_rate_limit_max)
            .scoped("contact"),
    )
    .with_store_timeout(store_timeout);

    let csrf_header = HeaderName::try_from(config.csrf_header.as_str())
        .with_context(|| format!("Invalid CSRF header name: '{}'", config.csrf_header))?;

    Ok(AppState {
        pipeline: Arc::new(DefensePipeline::new(
            CsrfGuard::new(csrf_header),
            Arc::new(global_limiter),
        )),
        contact_limiter: Arc::new(contact_limiter),
        counter_store,
        session_store,
        database,
        settings: Arc::new(HttpSettings {
            session_cookie: config.session_cookie.clone(),
            session_ttl_seconds: config.session_ttl_seconds,
            max_body_bytes: config.max_body_bytes,
            behind_proxy: config.behind_proxy,
        }),
    })
}

/// Connects Redis-backed stores, falling back to process memory.
///
/// In-memory counters are per instance, so limits no longer hold across a
/// multi-instance deployment.
async fn connect_stores(config: &Config, clock: Arc<dyn Clock>) -> Stores {
    if let Some(redis_url) = &config.redis_url {
        match connect_redis(redis_url).await {
            Ok(manager) => {
                tracing::info!("Stores enabled (Redis)");
                return (
                    Arc::new(RedisCounterStore::new(manager.clone())),
                    Arc::new(RedisSessionStore::new(manager, config.session_ttl_seconds)),
                );
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using in-memory stores.", e);
            }
        }
    } else {
        tracing::info!("Redis not configured, using in-memory stores");
    }

    (
        Arc::new(MemoryCounterStore::new(clock.clone())),
        Arc::new(MemorySessionStore::new(clock, config.session_ttl_seconds)),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
