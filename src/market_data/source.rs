use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;

/// Batched lookup result: provider id → price, `None` when the source had no
/// usable price for that id. Ids the source omitted entirely are simply absent.
pub type PriceQuotes = HashMap<String, Option<Decimal>>;

/// Failure of a whole batched lookup.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PriceSourceError {
    /// No connection could be made, or the request timed out.
    #[error("price source unreachable: {0}")]
    Connectivity(String),
    /// The source answered with a non-success status.
    #[error("price source returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("price source failed: {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch current prices for every id in one request.
    async fn get_prices(
        &self,
        ids: &BTreeSet<String>,
        currency: &str,
    ) -> Result<PriceQuotes, PriceSourceError>;

    fn name(&self) -> &str;
}

/// Serves a fixed set of quotes. Useful offline and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, Decimal>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, provider_id: impl Into<String>, price: Decimal) -> Self {
        self.prices.insert(provider_id.into(), price);
        self
    }
}

#[async_trait::async_trait]
impl PriceSource for StaticPriceSource {
    async fn get_prices(
        &self,
        ids: &BTreeSet<String>,
        _currency: &str,
    ) -> Result<PriceQuotes, PriceSourceError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), Some(*p))))
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
