use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::database::table::bitcoin_data::BitcoinData;

pub mod table;

/// PostgreSQL 連線池封裝。
///
/// Built once in `main` and handed to whoever needs the datastore; every unit of
/// work borrows a connection from it through [`PostgresSQL::tx`].
#[derive(Clone)]
pub struct PostgresSQL {
    /// SQLx PostgreSQL 連線池實例。
    pool: PgPool,
}

impl PostgresSQL {
    /// 建立 PostgreSQL 連線池。
    ///
    /// The pool connects lazily, so a bad host only surfaces on first use
    /// (normally [`PostgresSQL::test_connection`]).
    ///
    /// # Errors
    /// 當連線字串無法解析時回傳錯誤。
    pub fn new(database_url: &str) -> Result<PostgresSQL> {
        let pool = PgPoolOptions::new()
            .max_lifetime(Some(Duration::from_secs(1800))) // 30 分鐘
            .max_connections(2)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600))) // 10 分鐘
            .connect_lazy(database_url)
            .context("wrong database URL")?;

        Ok(Self { pool })
    }

    /// 取得連線池參考。
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 從目前連線池建立一筆 transaction。
    ///
    /// # Errors
    /// 當 `BEGIN` 失敗時回傳錯誤。
    pub async fn tx(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool
            .begin()
            .await
            .context("Failed to begin a transaction")
    }

    /// Opens one connection and gives it straight back to the pool.
    pub async fn test_connection(&self) -> Result<()> {
        let conn = self
            .pool
            .acquire()
            .await
            .context("Failed to connect to PostgreSQL")?;
        drop(conn);

        Ok(())
    }

    /// Creates every table this process writes to when it does not exist yet.
    /// Existing tables are left untouched.
    pub async fn create_schema(&self) -> Result<()> {
        BitcoinData::create_table(&self.pool).await
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
