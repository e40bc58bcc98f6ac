/// Coinbase 現貨報價
pub mod coinbase;
