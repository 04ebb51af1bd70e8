//! MySQL/MariaDB source implementation.
//!
//! Implements [`SourcePort`] on top of SQLx. Each `query` call spawns a task
//! that drives the row stream and decodes rows into neutral values; decoded
//! rows travel over a bounded channel, so a slow destination backpressures
//! the read instead of buffering the result set in memory.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::EndpointConfig;
use crate::error::{Result, TransferError};
use crate::port::{RowCursor, SourcePort};
use crate::value::Row;

use super::convert::decode_row;

/// Connection pool timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Decoded rows buffered between the reader task and the engine.
const ROW_CHANNEL_CAPACITY: usize = 1024;

/// MySQL source reader.
pub struct MysqlReader {
    pool: MySqlPool,
}

impl MysqlReader {
    /// Connect a reader to the given endpoint and probe the connection.
    pub async fn connect(config: &EndpointConfig) -> Result<Self> {
        let ssl_mode = match config.ssl_mode.as_str() {
            "disabled" => MySqlSslMode::Disabled,
            "required" => MySqlSslMode::Required,
            _ => MySqlSslMode::Preferred,
        };

        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(ssl_mode);

        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await?;

        // Test connection
        sqlx::query("SELECT 1").fetch_one(&pool).await?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }

    /// Test the database connection.
    pub async fn test_connection(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SourcePort for MysqlReader {
    async fn query(&self, sql: &str) -> Result<Box<dyn RowCursor>> {
        let (tx, rx) = mpsc::channel(ROW_CHANNEL_CAPACITY);
        let pool = self.pool.clone();
        let sql = sql.to_string();

        tokio::spawn(async move {
            let mut stream = sqlx::query(&sql).fetch(&pool);
            while let Some(item) = stream.next().await {
                let decoded = match item {
                    Ok(row) => decode_row(&row),
                    Err(e) => Err(TransferError::from(e)),
                };
                let failed = decoded.is_err();
                if tx.send(decoded).await.is_err() {
                    // Receiver gone; the transfer stopped early.
                    debug!("Row stream abandoned by receiver");
                    break;
                }
                if failed {
                    break;
                }
            }
        });

        Ok(Box::new(ChannelCursor { rx }))
    }

    async fn count(&self, sql: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

/// Cursor over the reader task's channel.
struct ChannelCursor {
    rx: mpsc::Receiver<Result<Row>>,
}

#[async_trait]
impl RowCursor for ChannelCursor {
    async fn fetch(&mut self, max_rows: usize) -> Result<Vec<Row>> {
        let mut rows = Vec::with_capacity(max_rows.min(ROW_CHANNEL_CAPACITY));
        while rows.len() < max_rows {
            match self.rx.recv().await {
                Some(Ok(row)) => rows.push(row),
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    fn cursor_over(items: Vec<Result<Row>>) -> ChannelCursor {
        let (tx, rx) = mpsc::channel(16);
        for item in items {
            tx.try_send(item).unwrap();
        }
        drop(tx);
        ChannelCursor { rx }
    }

    #[tokio::test]
    async fn test_cursor_respects_max_rows() {
        let rows: Vec<Result<Row>> = (0..5).map(|i| Ok(vec![SqlValue::I64(i)])).collect();
        let mut cursor = cursor_over(rows);

        assert_eq!(cursor.fetch(2).await.unwrap().len(), 2);
        assert_eq!(cursor.fetch(2).await.unwrap().len(), 2);
        assert_eq!(cursor.fetch(2).await.unwrap().len(), 1);
        assert!(cursor.fetch(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cursor_surfaces_stream_errors() {
        let mut cursor = cursor_over(vec![
            Ok(vec![SqlValue::I64(1)]),
            Err(TransferError::source_query("connection reset")),
        ]);

        // A full fetch window stops before reaching the buffered error.
        assert_eq!(cursor.fetch(1).await.unwrap().len(), 1);
        let err = cursor.fetch(10).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_cursor_exhausted_stays_empty() {
        let mut cursor = cursor_over(vec![]);
        assert!(cursor.fetch(3).await.unwrap().is_empty());
        assert!(cursor.fetch(3).await.unwrap().is_empty());
    }
}
