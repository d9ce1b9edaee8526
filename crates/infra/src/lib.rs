//! Infrastructure layer: configuration, Postgres and MongoDB persistence,
//! transactions and schema migrations.

pub mod config;
pub mod migrate;
pub mod mongo;
pub mod persistence;
pub mod transaction;

pub use config::{ConfigError, load_config};
pub use migrate::{MigrateConfig, MigrateError};
pub use mongo::{MongoConfig, MongoError, MongoPersistence};
pub use persistence::{DatabaseConfig, DbError, Service, TIME_FORMAT, now_utc};
pub use transaction::{Transaction, TxFuture};
