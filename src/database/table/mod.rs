/// 比特幣現貨報價紀錄
pub mod bitcoin_data;
