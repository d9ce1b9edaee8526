//! Schema migrations from a directory of `<VERSION>_<DESCRIPTION>.sql` files.
//!
//! Applied versions are tracked in sqlx's `_sqlx_migrations` table. A row
//! with `success = false` marks the schema as dirty: a migration failed part
//! way and needs a manual fix before anything else is applied.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use sqlx::migrate::{Migrate, Migrator};
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use svckit_observability::{Field, Logger};

use crate::persistence::DatabaseConfig;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("migration {0} is dirty, needs a manual fix")]
    Dirty(i64),

    #[error("failed to load migrations from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub database: DatabaseConfig,
    pub directory: PathBuf,
    /// Clear the dirty marker left by a failed run of this version.
    pub force_version: Option<i64>,
}

/// Load the migrations found in `directory`.
pub async fn load(directory: &Path) -> Result<Migrator, MigrateError> {
    Migrator::new(directory)
        .await
        .map_err(|source| MigrateError::Load {
            path: directory.to_path_buf(),
            source,
        })
}

/// Connect to the configured database and apply every pending migration.
pub async fn up(config: &MigrateConfig, logger: &dyn Logger) -> Result<(), MigrateError> {
    let migrator = load(&config.directory).await?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(config.database.connect_options())
        .await?;

    logger.debug(
        "[dbmigration] connected",
        &[Field::new("migrate_pg_host", &config.database.host)],
    );

    let result = run(&migrator, &pool, config.force_version, logger).await;
    pool.close().await;
    result
}

/// Apply `migrator` to `pool`.
///
/// Refuses to run when the schema is dirty. Having nothing to apply is not
/// an error.
pub async fn run(
    migrator: &Migrator,
    pool: &PgPool,
    force_version: Option<i64>,
    logger: &dyn Logger,
) -> Result<(), MigrateError> {
    let mut conn = pool.acquire().await?;
    conn.ensure_migrations_table().await?;

    if let Some(version) = force_version {
        let cleared =
            sqlx::query("DELETE FROM _sqlx_migrations WHERE version = $1 AND success = false")
                .bind(version)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        logger.info(
            "[dbmigration] forced version",
            &[
                Field::new("force_version", version),
                Field::new("cleared", cleared),
            ],
        );
    }

    if let Some(version) = conn.dirty_version().await? {
        return Err(MigrateError::Dirty(version));
    }

    let before = current_version(&mut conn).await?;
    logger.info(
        "current migration status",
        &[
            Field::new("migration_version", before),
            Field::new("migration_dirty", false),
        ],
    );
    drop(conn);

    migrator.run(pool).await?;

    let mut conn = pool.acquire().await?;
    let after = current_version(&mut conn).await?;
    if after == before {
        logger.info("no migration to apply", &[Field::new("migration_version", after)]);
    } else {
        logger.info(
            "migration applied",
            &[
                Field::new("migration_version", after),
                Field::new("migration_dirty", false),
            ],
        );
    }
    Ok(())
}

/// Highest applied version, or 0 on a fresh schema.
async fn current_version(conn: &mut PoolConnection<Postgres>) -> Result<i64, MigrateError> {
    let applied = conn.list_applied_migrations().await?;
    Ok(applied.iter().map(|m| m.version).max().unwrap_or(0))
}
