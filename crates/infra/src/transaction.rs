//! Serializable transactions over the shared pool.

use std::future::Future;
use std::pin::Pin;

use sqlx::{PgConnection, PgPool};

/// Future returned by the closure passed to [`Transaction::exec_tx`].
pub type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

#[derive(Debug, Clone)]
pub struct Transaction {
    pool: PgPool,
}

impl Transaction {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run `f` inside a SERIALIZABLE transaction.
    ///
    /// Commits when `f` succeeds. When `f` fails the transaction is rolled
    /// back and `f`'s error is returned; a failed rollback is only logged.
    ///
    /// ```ignore
    /// let id = tx.exec_tx(|conn| Box::pin(async move {
    ///     sqlx::query_scalar("INSERT INTO users (name) VALUES ($1) RETURNING id")
    ///         .bind("ada")
    ///         .fetch_one(&mut *conn)
    ///         .await
    /// })).await?;
    /// ```
    pub async fn exec_tx<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<sqlx::Error>,
        F: for<'c> FnOnce(&'c mut PgConnection) -> TxFuture<'c, T, E>,
    {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}
