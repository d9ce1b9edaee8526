//! MongoDB persistence: a configured client plus insert and aggregate helpers.
//!
//! Every command the driver sends is logged at debug level through the
//! injected [`Logger`]; failed commands are logged at warn level.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{Bson, Document};
use mongodb::event::EventHandler;
use mongodb::event::command::CommandEvent;
use mongodb::options::{ClientOptions, Credential};
use mongodb::{Client, Database};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use svckit_core::HttpError;
use svckit_observability::{Field, Logger};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MongoError {
    #[error("invalid mongo configuration: {0}")]
    Config(#[source] mongodb::error::Error),

    #[error("mongo {operation} on {collection} failed: {source}")]
    Command {
        operation: &'static str,
        collection: String,
        #[source]
        source: mongodb::error::Error,
    },

    #[error("failed to decode {collection} document: {source}")]
    Decode {
        collection: String,
        #[source]
        source: mongodb::bson::de::Error,
    },
}

impl From<MongoError> for HttpError {
    fn from(err: MongoError) -> Self {
        HttpError::internal_server(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    /// Connection string, or a bare `host:port`.
    pub host: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            host: "mongodb://localhost:27017".to_string(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl MongoConfig {
    pub fn connection_uri(&self) -> String {
        if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("mongodb://{}", self.host)
        }
    }

    /// Credentials to authenticate with; `None` when no username is set.
    pub fn credential(&self) -> Option<Credential> {
        if self.username.is_empty() {
            return None;
        }
        let mut credential = Credential::default();
        credential.username = Some(self.username.clone());
        if !self.password.is_empty() {
            credential.password = Some(self.password.clone());
        }
        Some(credential)
    }
}

#[derive(Clone)]
pub struct MongoPersistence {
    client: Client,
    database: String,
    logger: Arc<dyn Logger>,
}

impl MongoPersistence {
    /// Build a client for `config`.
    ///
    /// The driver connects in the background; an unreachable server
    /// surfaces as an error from the first command, after the 10s connect
    /// timeout.
    pub async fn connect(config: &MongoConfig, logger: Arc<dyn Logger>) -> Result<Self, MongoError> {
        let mut options = ClientOptions::parse(config.connection_uri())
            .await
            .map_err(MongoError::Config)?;
        if let Some(credential) = config.credential() {
            options.credential = Some(credential);
        }
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.server_selection_timeout = Some(CONNECT_TIMEOUT);
        options.command_event_handler = Some(command_logger(logger.clone()));

        let client = Client::with_options(options).map_err(MongoError::Config)?;
        logger.info(
            "mongo client configured",
            &[Field::new("mongo_database", &config.database)],
        );

        Ok(Self {
            client,
            database: config.database.clone(),
            logger,
        })
    }

    pub fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    /// Insert `item` into `collection` and return its `_id`.
    pub async fn insert_one<T>(&self, collection: &str, item: &T) -> Result<Bson, MongoError>
    where
        T: Serialize + Send + Sync,
    {
        let result = self
            .database()
            .collection::<T>(collection)
            .insert_one(item)
            .await
            .map_err(|source| self.command_failed("insert_one", collection, source))?;
        Ok(result.inserted_id)
    }

    /// Run `pipeline` on `collection` and decode every result into `T`.
    pub async fn aggregate<T>(
        &self,
        collection: &str,
        pipeline: impl IntoIterator<Item = Document>,
    ) -> Result<Vec<T>, MongoError>
    where
        T: DeserializeOwned,
    {
        let mut cursor = self
            .database()
            .collection::<Document>(collection)
            .aggregate(pipeline)
            .await
            .map_err(|source| self.command_failed("aggregate", collection, source))?;

        let mut results = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|source| self.command_failed("aggregate", collection, source))?
        {
            let doc = cursor
                .deserialize_current()
                .map_err(|source| self.command_failed("aggregate", collection, source))?;
            let item = mongodb::bson::from_document(doc).map_err(|source| MongoError::Decode {
                collection: collection.to_string(),
                source,
            })?;
            results.push(item);
        }
        Ok(results)
    }

    fn command_failed(
        &self,
        operation: &'static str,
        collection: &str,
        source: mongodb::error::Error,
    ) -> MongoError {
        self.logger.error(
            "mongo command failed",
            &[
                Field::new("operation", operation),
                Field::new("collection", collection),
                Field::new("error", &source),
            ],
        );
        MongoError::Command {
            operation,
            collection: collection.to_string(),
            source,
        }
    }
}

impl std::fmt::Debug for MongoPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoPersistence")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

fn command_logger(logger: Arc<dyn Logger>) -> EventHandler<CommandEvent> {
    EventHandler::callback(move |event: CommandEvent| match event {
        CommandEvent::Started(started) => logger.debug(
            "mongo command started",
            &[
                Field::new("command", &started.command_name),
                Field::new("db", &started.db),
                Field::new("request_id", started.request_id),
            ],
        ),
        CommandEvent::Succeeded(done) => logger.debug(
            "mongo command succeeded",
            &[
                Field::new("command", &done.command_name),
                Field::new("request_id", done.request_id),
                Field::new("duration_ms", done.duration.as_millis()),
            ],
        ),
        CommandEvent::Failed(failed) => logger.warn(
            "mongo command failed",
            &[
                Field::new("command", &failed.command_name),
                Field::new("request_id", failed.request_id),
                Field::new("error", &failed.failure),
            ],
        ),
        _ => {}
    })
}
