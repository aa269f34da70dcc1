//! CoinGecko price source.
//!
//! Uses the free `/simple/price` endpoint, which accepts a comma-separated
//! list of coin ids and returns current prices for all of them at once.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

use crate::market_data::{PriceQuotes, PriceSource, PriceSourceError};

pub const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("coinfolio/", env!("CARGO_PKG_VERSION"));

/// CoinGecko batched price source.
///
/// No API key is required for basic usage, though rate limits apply.
pub struct CoinGeckoPriceSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CoinGeckoPriceSource {
    /// Creates a source against the public API with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a source whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new()).timeout_after(timeout)
    }

    /// Creates a source with a custom reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: COINGECKO_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds each price request, applied per request on top of the client.
    pub fn timeout_after(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Points the source at another API root (mirrors, mock servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn simple_price_url(&self) -> String {
        format!("{}/simple/price", self.base_url)
    }
}

impl Default for CoinGeckoPriceSource {
    fn default() -> Self {
        Self::new()
    }
}

fn classify_transport_error(err: reqwest::Error) -> PriceSourceError {
    if err.is_connect() || err.is_timeout() {
        PriceSourceError::Connectivity(err.to_string())
    } else if let Some(status) = err.status() {
        PriceSourceError::Http {
            status: status.as_u16(),
            body: err.to_string(),
        }
    } else {
        PriceSourceError::Other(err.to_string())
    }
}

/// Extract a price from a JSON value. Anything other than a number is
/// treated as "no price".
///
/// Numbers finer than 28 decimal places are rounded to fit; numbers beyond
/// the `Decimal` range are dropped with their own warning.
fn price_from_value(id: &str, value: &Value) -> Option<Decimal> {
    let Value::Number(number) = value else {
        return None;
    };
    let raw = number.to_string();
    if let Ok(price) = Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)) {
        return Some(price);
    }

    let float = number.as_f64()?;
    if float.is_finite() && float.abs() < 1.0 {
        return Some(
            Decimal::from_f64(float)
                .map(|price| price.round_dp(28))
                .unwrap_or(Decimal::ZERO),
        );
    }

    warn!(provider_id = id, price = %raw, "Quoted price is outside the supported range");
    None
}

/// Demultiplex a `/simple/price` body into per-id quotes.
///
/// Every requested id appears in the result; ids missing from the body map to
/// `None` so callers can tell "asked but not answered" apart from transport
/// failures.
fn parse_simple_price(
    body: &Value,
    ids: &BTreeSet<String>,
    currency: &str,
) -> Result<PriceQuotes, PriceSourceError> {
    let Value::Object(coins) = body else {
        return Err(PriceSourceError::Other(format!(
            "unexpected CoinGecko response shape: {body}"
        )));
    };

    Ok(ids
        .iter()
        .map(|id| {
            let price = coins
                .get(id)
                .and_then(|prices| prices.get(currency))
                .and_then(|price| price_from_value(id, price));
            (id.clone(), price)
        })
        .collect())
}

#[async_trait::async_trait]
impl PriceSource for CoinGeckoPriceSource {
    async fn get_prices(
        &self,
        ids: &BTreeSet<String>,
        currency: &str,
    ) -> Result<PriceQuotes, PriceSourceError> {
        let currency = currency.trim().to_lowercase();
        let joined = ids.iter().map(String::as_str).collect::<Vec<_>>().join(",");

        let response = self
            .client
            .get(self.simple_price_url())
            .timeout(self.timeout)
            .query(&[("ids", joined.as_str()), ("vs_currencies", currency.as_str())])
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(classify_transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PriceSourceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(classify_transport_error)?;
        parse_simple_price(&body, ids, &currency)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}
