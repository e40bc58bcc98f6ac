use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;

use crate::logging::Logger;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// 單次請求失敗時的最大嘗試次數。
const MAX_RETRIES: u32 = 3;

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(15))
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
///
/// Non-2xx responses are treated as failures, so the body of an error page never
/// reaches the caller's deserializer.
pub async fn get_json<RES: DeserializeOwned>(url: &str) -> Result<RES> {
    get_response(url, None)
        .await?
        .json::<RES>()
        .await
        .map_err(|e| anyhow!("Error parsing response JSON: {:?}", e))
}

pub async fn get_response(url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    send(Method::GET, url, headers).await
}

/// Sends an HTTP request, retrying with exponential backoff on transport errors
/// and on non-success status codes.
///
/// # Errors
///
/// Returns the last failure once `MAX_RETRIES` attempts have been used.
async fn send(method: Method, url: &str, headers: Option<header::HeaderMap>) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb = client.request(method, url);
    let mut last_error = String::new();

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    for attempt in 1..=MAX_RETRIES {
        let msg = format!("Attempt {} to send {}", attempt, visit_log);
        let rb_clone = rb
            .try_clone()
            .ok_or_else(|| anyhow!("Failed to clone RequestBuilder"))?;
        let start = Instant::now();
        let res = rb_clone.send().await.and_then(Response::error_for_status);
        let elapsed = start.elapsed().as_millis();

        match res {
            Ok(response) => {
                LOGGER.info(format!("{} {} ms", msg, elapsed));
                return Ok(response);
            }
            Err(why) => {
                last_error = format!("{:?}", why);
                LOGGER.error(format!("{} failed because {:?}. {} ms", msg, why, elapsed));
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(backoff(attempt)).await;
                }
            }
        }
    }

    Err(anyhow!(
        "Failed to send request to {} after {} attempts; last error: {}",
        url,
        MAX_RETRIES,
        last_error
    ))
}

/// 1s, 2s, 4s ...
fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(2u64.pow(attempt.saturating_sub(1)))
}
