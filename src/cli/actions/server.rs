use crate::{
    api,
    catalog::storage::{MemoryStore, PgStore, SharedStore},
    cli::telemetry,
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub enum StoreBackend {
    Memory,
    Postgres {
        dsn: String,
        max_connections: u32,
        apply_schema: bool,
    },
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub store: StoreBackend,
    pub session_ttl: Duration,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be
/// applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let store: SharedStore = match args.store {
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Postgres {
            dsn,
            max_connections,
            apply_schema,
        } => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(max_connections)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(&dsn)
                .await
                .context("Failed to connect to database")?;

            let store = PgStore::new(pool);
            if apply_schema {
                store
                    .apply_schema()
                    .await
                    .context("Failed to apply database schema")?;
                info!("Database schema applied");
            }
            Arc::new(store)
        }
    };

    let result = api::new(args.port, store, args.session_ttl).await;
    telemetry::shutdown_tracer();
    result
}

fn log_startup_args(args: &Args) {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    let store = match &args.store {
        StoreBackend::Memory => "memory".to_string(),
        StoreBackend::Postgres {
            dsn,
            max_connections,
            apply_schema,
        } => format!(
            "postgres ({}, max_connections={max_connections}, apply_schema={apply_schema})",
            redact_dsn(dsn)
        ),
    };

    info!(
        "menus {} - {short_hash}\n  listen:      tcp:{}\n  store:       {store}\n  session_ttl: {}s",
        env!("CARGO_PKG_VERSION"),
        args.port,
        args.session_ttl.as_secs()
    );
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
