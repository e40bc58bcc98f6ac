use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::{
    database::{table::bitcoin_data::BitcoinData, PostgresSQL},
    declare::ApiResponse,
    etl::QuoteSink,
    logging,
};

/// Writes quotes into `bitcoin_data`, one transaction per quote.
pub struct PostgresSink {
    db: PostgresSQL,
    /// 寫入後列出整張表
    print_table: bool,
}

impl PostgresSink {
    pub fn new(db: PostgresSQL, print_table: bool) -> Self {
        PostgresSink { db, print_table }
    }

    async fn list_rows(&self) -> Result<Vec<BitcoinData>> {
        let mut conn = self
            .db
            .pool()
            .acquire()
            .await
            .context("Failed to acquire a connection for listing bitcoin_data")?;

        BitcoinData::fetch_all(&mut conn).await
    }
}

/// Prints every row, or logs why they could not be read. Returns whether the
/// rows were printed.
pub(crate) fn print_table(rows: Result<Vec<BitcoinData>>) -> bool {
    match rows {
        Ok(rows) => {
            logging::info_console("Data stored in PostgreSQL:".to_string());
            for row in rows {
                println!("{}", row);
            }
            true
        }
        Err(why) => {
            logging::error_console(format!("Failed to list bitcoin_data because {:#}", why));
            logging::error_file_async(format!("Failed to list bitcoin_data because {:?}", why));
            false
        }
    }
}

#[async_trait]
impl QuoteSink for PostgresSink {
    async fn load(&self, quote: &ApiResponse) -> Result<BitcoinData> {
        let mut tx = self.db.tx().await?;

        let entry = BitcoinData::new(
            quote.data.amount.clone(),
            quote.data.base.clone(),
            quote.data.currency.clone(),
            Utc::now().naive_utc(),
        );
        let inserted = entry.insert(&mut tx).await?;

        tx.commit()
            .await
            .context(format!("Failed to commit BitcoinData({})", inserted.id))?;

        logging::info_file_async(format!("Stored {}", inserted));

        // 列表只供觀察，失敗不影響已 commit 的資料
        if self.print_table {
            print_table(self.list_rows().await);
        }

        Ok(inserted)
    }
}
