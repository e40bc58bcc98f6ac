use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::{declare::RawApiResponse, etl::SpotPriceSource, util};

pub const HOST: &str = "api.coinbase.com";

/// Coinbase spot price endpoint, e.g.
/// `https://api.coinbase.com/v2/prices/spot?currency=USD`.
pub struct Coinbase {
    url: String,
}

impl Coinbase {
    pub fn new(url: String) -> Self {
        Coinbase { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SpotPriceSource for Coinbase {
    async fn extract(&self) -> Result<RawApiResponse> {
        util::http::get_json::<RawApiResponse>(&self.url)
            .await
            .with_context(|| format!("Failed to fetch spot price from {}", self.url))
    }
}
