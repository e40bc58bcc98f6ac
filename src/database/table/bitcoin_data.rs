use std::fmt;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{PgConnection, PgPool};

/// `bitcoin_data` 資料表的資料列。
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Eq)]
pub struct BitcoinData {
    /// 流水號，由資料庫產生。
    pub id: i32,
    /// 報價，保留 API 原始字串。
    pub amount: String,
    pub base: String,
    pub currency: String,
    /// 寫入時間（UTC）。
    pub timestamp: Option<NaiveDateTime>,
}

impl BitcoinData {
    /// 建立一筆尚未寫入的紀錄，`id` 於寫入後才會有值。
    pub fn new(amount: String, base: String, currency: String, timestamp: NaiveDateTime) -> Self {
        BitcoinData {
            id: 0,
            amount,
            base,
            currency,
            timestamp: Some(timestamp),
        }
    }

    pub async fn create_table(pool: &PgPool) -> Result<()> {
        let sql = r#"
CREATE TABLE IF NOT EXISTS bitcoin_data
(
    id          SERIAL PRIMARY KEY,
    amount      VARCHAR NOT NULL,
    base        VARCHAR NOT NULL,
    currency    VARCHAR NOT NULL,
    "timestamp" TIMESTAMP DEFAULT (now() AT TIME ZONE 'utc')
);"#;
        sqlx::query(sql)
            .execute(pool)
            .await
            .context("Failed to BitcoinData::create_table() from database")?;

        Ok(())
    }

    /// 新增一筆紀錄並回傳資料庫實際存下的內容（含 `id`）。
    ///
    /// # Errors
    /// 當 SQL 執行失敗時回傳錯誤。
    pub async fn insert(&self, conn: &mut PgConnection) -> Result<BitcoinData> {
        let sql = r#"
INSERT INTO bitcoin_data (amount, base, currency, "timestamp")
VALUES ($1, $2, $3, COALESCE($4, now() AT TIME ZONE 'utc'))
RETURNING id, amount, base, currency, "timestamp";"#;

        sqlx::query_as::<_, BitcoinData>(sql)
            .bind(&self.amount)
            .bind(&self.base)
            .bind(&self.currency)
            .bind(self.timestamp)
            .fetch_one(conn)
            .await
            .context(format!(
                "Failed to BitcoinData::insert({:#?}) from database",
                self
            ))
    }

    /// 依 `id` 排序取出全部紀錄
    pub async fn fetch_all(conn: &mut PgConnection) -> Result<Vec<BitcoinData>> {
        let sql = r#"
SELECT id, amount, base, currency, "timestamp"
FROM bitcoin_data
ORDER BY id;"#;

        sqlx::query_as::<_, BitcoinData>(sql)
            .fetch_all(conn)
            .await
            .context("Failed to BitcoinData::fetch_all() from database")
    }
}

impl fmt::Display for BitcoinData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ID: {}, Amount: {}, Base: {}, Currency: {}, Timestamp: ",
            self.id, self.amount, self.base, self.currency
        )?;

        match self.timestamp {
            Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
            None => write!(f, "None"),
        }
    }
}
