//! MySQL/MariaDB destination implementation.
//!
//! Implements [`DestPort`] using mysql_async. Every batch runs as one
//! transaction: the INSERT is executed once per row against a single
//! prepared statement and committed before returning, so a failed batch
//! leaves nothing behind.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::{Opts, OptsBuilder, Params, Pool, SslOpts, TxOpts};
use tracing::{debug, info, warn};

use crate::config::EndpointConfig;
use crate::error::Result;
use crate::port::DestPort;
use crate::value::Row;

use super::convert::to_mysql_params;

/// MySQL destination writer.
pub struct MysqlWriter {
    pool: Pool,
}

impl MysqlWriter {
    /// Connect a writer to the given endpoint and probe the connection.
    pub async fn connect(config: &EndpointConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.as_str() {
            "disabled" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            // "preferred" and "required" both encrypt without certificate
            // verification, matching MySQL's own REQUIRED semantics.
            _ => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.as_str())
            .tcp_port(config.port)
            .db_name(Some(config.database.as_str()))
            .user(Some(config.user.as_str()))
            .pass(Some(config.password.as_str()))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let opts: Opts = builder.into();
        let pool = Pool::new(opts);

        // Test connection
        let mut conn = pool.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        drop(conn);

        info!(
            "Connected to MySQL destination: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }

    /// Test the database connection.
    pub async fn test_connection(&self) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        Ok(())
    }

    /// Disconnect the pool. mysql_async pools must be torn down explicitly.
    pub async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

#[async_trait]
impl DestPort for MysqlWriter {
    async fn write_batch(&self, sql: &str, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get_conn().await?;

        // The transaction rolls back on drop if anything below fails.
        let mut tx = conn.start_transaction(TxOpts::default()).await?;

        let params: Vec<Params> = rows.iter().map(to_mysql_params).collect();
        tx.exec_batch(sql, params).await?;
        tx.commit().await?;

        debug!("MySQL: wrote {} rows", rows.len());
        Ok(rows.len() as u64)
    }
}
