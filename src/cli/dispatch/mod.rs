use crate::cli::{
    actions::{
        Action,
        server::{Args, StoreBackend},
    },
    commands::STORE_MEMORY,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);

    let store = if matches
        .get_one::<String>("store")
        .is_some_and(|store| store == STORE_MEMORY)
    {
        StoreBackend::Memory
    } else {
        StoreBackend::Postgres {
            dsn: matches
                .get_one::<String>("dsn")
                .cloned()
                .context("missing required argument: --dsn")?,
            max_connections: matches
                .get_one::<u32>("max-connections")
                .copied()
                .unwrap_or(5),
            apply_schema: matches.get_flag("apply-schema"),
        }
    };

    let session_ttl = matches
        .get_one::<u64>("session-ttl-seconds")
        .copied()
        .map(Duration::from_secs)
        .context("missing required argument: --session-ttl-seconds")?;

    Ok(Action::Server(Args {
        port,
        store,
        session_ttl,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn memory_store_ignores_dsn() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "menus",
            "--store",
            "memory",
            "--session-ttl-seconds",
            "30",
        ])?;
        let Action::Server(args) = handler(&matches)?;
        assert!(matches!(args.store, StoreBackend::Memory));
        assert_eq!(args.session_ttl, Duration::from_secs(30));
        Ok(())
    }

    #[test]
    fn postgres_store_carries_pool_settings() -> Result<()> {
        let matches = commands::new().try_get_matches_from(vec![
            "menus",
            "--store",
            "postgres",
            "--dsn",
            "postgres://localhost/menus",
            "--max-connections",
            "7",
            "--apply-schema",
            "--port",
            "8443",
        ])?;
        let Action::Server(args) = handler(&matches)?;
        assert_eq!(args.port, 8443);
        match args.store {
            StoreBackend::Postgres {
                dsn,
                max_connections,
                apply_schema,
            } => {
                assert_eq!(dsn, "postgres://localhost/menus");
                assert_eq!(max_connections, 7);
                assert!(apply_schema);
            }
            StoreBackend::Memory => panic!("expected postgres backend"),
        }
        Ok(())
    }
}
