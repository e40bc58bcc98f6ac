//! One extract → transform → load cycle and the seams it runs through.
//!
//! The driver only sees [`SpotPriceSource`] and [`QuoteSink`], so the same cycle
//! runs against the live API and PostgreSQL or against in-memory stand-ins.

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::{
    database::table::bitcoin_data::BitcoinData,
    declare::{ApiResponse, RawApiResponse, SchemaValidationError},
};

pub mod load;

/// Everything that can go wrong while the pipeline runs.
#[derive(Error, Debug)]
pub enum Fault {
    /// Startup ping failed. Reported, never fatal.
    #[error("connectivity fault: {0:#}")]
    Connectivity(anyhow::Error),
    #[error("network fault: {0:#}")]
    Network(anyhow::Error),
    #[error("schema validation fault: {0}")]
    SchemaValidation(#[from] SchemaValidationError),
    #[error("persistence fault: {0:#}")]
    Persistence(anyhow::Error),
}

/// 報價來源
#[async_trait]
pub trait SpotPriceSource {
    /// Fetches one response body, undecoded beyond JSON.
    async fn extract(&self) -> Result<RawApiResponse>;
}

/// 報價寫入端
#[async_trait]
pub trait QuoteSink {
    /// Stores one validated quote and returns the row as stored.
    async fn load(&self, quote: &ApiResponse) -> Result<BitcoinData>;
}

/// Maps a raw response onto the strict quote schema.
pub fn transform(raw: &RawApiResponse) -> Result<ApiResponse, SchemaValidationError> {
    ApiResponse::try_from(raw)
}

/// Runs one full cycle. A fault at any stage stops the cycle before the next
/// stage starts, so a rejected response never reaches the sink.
pub async fn run_cycle<S, K>(source: &S, sink: &K) -> Result<BitcoinData, Fault>
where
    S: SpotPriceSource + ?Sized,
    K: QuoteSink + ?Sized,
{
    let raw = source.extract().await.map_err(Fault::Network)?;
    let quote = transform(&raw)?;

    sink.load(&quote).await.map_err(Fault::Persistence)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::declare::JsonType;

    /// Replays a fixed body, or fails with a network error when `body` is `None`.
    pub(crate) struct FixedSource {
        pub body: Option<RawApiResponse>,
        pub calls: Mutex<u32>,
    }

    impl FixedSource {
        pub fn new(body: RawApiResponse) -> Self {
            FixedSource {
                body: Some(body),
                calls: Mutex::new(0),
            }
        }

        pub fn offline() -> Self {
            FixedSource {
                body: None,
                calls: Mutex::new(0),
            }
        }

        pub fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl SpotPriceSource for FixedSource {
        async fn extract(&self) -> Result<RawApiResponse> {
            *self.calls.lock().unwrap() += 1;
            self.body
                .clone()
                .ok_or_else(|| anyhow!("dns error: failed to lookup address information"))
        }
    }

    /// Table stand-in with serial ids.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub rows: Mutex<Vec<BitcoinData>>,
    }

    impl MemorySink {
        /// Starts as if the table already held `existing` rows.
        pub fn with_existing(existing: i32) -> Self {
            let rows = (1..=existing)
                .map(|id| BitcoinData {
                    id,
                    amount: "1.00".to_string(),
                    base: "BTC".to_string(),
                    currency: "USD".to_string(),
                    timestamp: Some(Utc::now().naive_utc()),
                })
                .collect();
            MemorySink {
                rows: Mutex::new(rows),
            }
        }

        pub fn rows(&self) -> Vec<BitcoinData> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteSink for MemorySink {
        async fn load(&self, quote: &ApiResponse) -> Result<BitcoinData> {
            let mut rows = self.rows.lock().unwrap();
            let mut row = BitcoinData::new(
                quote.data.amount.clone(),
                quote.data.base.clone(),
                quote.data.currency.clone(),
                Utc::now().naive_utc(),
            );
            row.id = rows.last().map_or(1, |last| last.id + 1);
            rows.push(row.clone());

            Ok(row)
        }
    }

    /// Rejects every write.
    pub(crate) struct BrokenSink;

    #[async_trait]
    impl QuoteSink for BrokenSink {
        async fn load(&self, _quote: &ApiResponse) -> Result<BitcoinData> {
            Err(anyhow!("connection reset by peer"))
        }
    }

    fn btc_usd() -> RawApiResponse {
        json!({"data": {"amount": "50000.00", "base": "BTC", "currency": "USD"}})
    }

    #[tokio::test]
    async fn test_cycle_stores_one_row() {
        let source = FixedSource::new(btc_usd());
        let sink = MemorySink::default();

        let before = Utc::now().naive_utc();
        let row = run_cycle(&source, &sink).await.unwrap();
        let after = Utc::now().naive_utc();

        let rows = sink.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], row);
        assert_eq!(row.amount, "50000.00");
        assert_eq!(row.base, "BTC");
        assert_eq!(row.currency, "USD");
        let ts = row.timestamp.unwrap();
        assert!(before <= ts && ts <= after);
    }

    #[tokio::test]
    async fn test_consecutive_cycles_increment_ids() {
        let source = FixedSource::new(btc_usd());
        let sink = MemorySink::with_existing(41);

        for _ in 0..5 {
            run_cycle(&source, &sink).await.unwrap();
        }

        let ids: Vec<i32> = sink.rows().iter().skip(41).map(|r| r.id).collect();
        assert_eq!(ids, vec![42, 43, 44, 45, 46]);
        assert_eq!(source.calls(), 5);
    }

    #[tokio::test]
    async fn test_numeric_amount_inserts_nothing() {
        let source = FixedSource::new(
            json!({"data": {"amount": 50000.00, "base": "BTC", "currency": "USD"}}),
        );
        let sink = MemorySink::default();

        match run_cycle(&source, &sink).await {
            Err(Fault::SchemaValidation(SchemaValidationError::WrongType {
                field,
                expected,
                found,
            })) => {
                assert_eq!(field, "data.amount");
                assert_eq!(expected, JsonType::String);
                assert_eq!(found, JsonType::Number);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_network_fault() {
        let sink = MemorySink::default();
        let fault = run_cycle(&FixedSource::offline(), &sink).await.unwrap_err();

        assert!(matches!(fault, Fault::Network(_)));
        assert!(fault.to_string().contains("dns error"));
        assert!(sink.rows().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_fault() {
        let fault = run_cycle(&FixedSource::new(btc_usd()), &BrokenSink)
            .await
            .unwrap_err();

        assert!(matches!(fault, Fault::Persistence(_)));
    }
}
