#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use coinfolio::market_data::{PriceQuotes, PriceSource, PriceSourceError};
use coinfolio::portfolio::{AssetRegistry, SymbolTable};
use rust_decimal::Decimal;

/// A batched lookup as the mock saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub ids: BTreeSet<String>,
    pub currency: String,
}

#[derive(Debug, Default)]
pub struct MockPriceSource {
    prices: HashMap<String, Option<Decimal>>,
    failure: Option<PriceSourceError>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, provider_id: &str, price: i64) -> Self {
        self.prices
            .insert(provider_id.to_string(), Some(Decimal::from(price)));
        self
    }

    /// The id is answered, but without a usable price.
    pub fn with_null(mut self, provider_id: &str) -> Self {
        self.prices.insert(provider_id.to_string(), None);
        self
    }

    pub fn failing_with(mut self, err: PriceSourceError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn get_prices(
        &self,
        ids: &BTreeSet<String>,
        currency: &str,
    ) -> Result<PriceQuotes, PriceSourceError> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(RecordedRequest {
                ids: ids.clone(),
                currency: currency.to_string(),
            });

        if let Some(err) = &self.failure {
            return Err(err.clone());
        }

        Ok(ids
            .iter()
            .filter_map(|id| self.prices.get(id).map(|price| (id.clone(), *price)))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn registry_with(holdings: &[(&str, &str)]) -> AssetRegistry {
    let mut registry = AssetRegistry::new(SymbolTable::builtin());
    for (symbol, amount) in holdings {
        registry
            .add_str(symbol, amount)
            .expect("test holding should be valid");
    }
    registry
}
