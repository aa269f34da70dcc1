use std::collections::BTreeSet;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::{saturating_sum, Report, ReportRow, SnapshotDocument, SnapshotEntry};
use crate::clock::Clock;
use crate::duration::format_timeout;
use crate::format::{format_report_price, format_report_value};
use crate::market_data::{PriceSource, PriceSourceError};
use crate::portfolio::AssetRegistry;

/// Default bound on a single batched price request.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Whole-request failure of [`ValuationEngine::refresh`]. Holdings keep
/// whatever prices they had before the call.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No internet connection: {0}")]
    NetworkUnavailable(String),
    #[error("API request error: {0}")]
    Provider(String),
}

impl From<PriceSourceError> for RefreshError {
    fn from(err: PriceSourceError) -> Self {
        match err {
            PriceSourceError::Connectivity(detail) => RefreshError::NetworkUnavailable(detail),
            PriceSourceError::Http { status, body } if body.is_empty() => {
                RefreshError::Provider(format!("HTTP {status}"))
            }
            PriceSourceError::Http { status, body } => {
                RefreshError::Provider(format!("HTTP {status}: {body}"))
            }
            PriceSourceError::Other(detail) => RefreshError::Provider(detail),
        }
    }
}

/// A holding the source had no usable price for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPrice {
    pub symbol: String,
    pub provider_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The registry was empty; no request was made.
    NothingToFetch,
    Fetched {
        /// Distinct provider ids sent in the batched request.
        requested: usize,
        /// Holdings that now carry a price.
        priced: usize,
        /// Holdings whose price was cleared, in registry order.
        missing: Vec<MissingPrice>,
    },
}

impl RefreshOutcome {
    pub fn missing(&self) -> &[MissingPrice] {
        match self {
            RefreshOutcome::NothingToFetch => &[],
            RefreshOutcome::Fetched { missing, .. } => missing,
        }
    }
}

/// Prices a registry through a [`PriceSource`] and reports on it.
#[derive(Debug, Clone)]
pub struct ValuationEngine {
    timeout: Duration,
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ValuationEngine {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch current prices for every holding with one batched request.
    ///
    /// Per-holding gaps clear that holding's price and are reported in the
    /// outcome; only a failure of the whole request returns `Err`, in which
    /// case no holding is touched.
    pub async fn refresh(
        &self,
        registry: &mut AssetRegistry,
        currency: &str,
        source: &dyn PriceSource,
    ) -> Result<RefreshOutcome, RefreshError> {
        if registry.is_empty() {
            debug!("No holdings in registry, nothing to fetch");
            return Ok(RefreshOutcome::NothingToFetch);
        }

        let ids: BTreeSet<String> = registry.provider_ids();
        let currency = normalize_api_currency(currency);

        let quotes = match tokio::time::timeout(self.timeout, source.get_prices(&ids, &currency)).await
        {
            Ok(Ok(quotes)) => quotes,
            Ok(Err(err)) => {
                let err = RefreshError::from(err);
                warn!(source = source.name(), error = %err, "Price refresh failed");
                return Err(err);
            }
            Err(_) => {
                let err = RefreshError::NetworkUnavailable(format!(
                    "price request timed out after {}",
                    format_timeout(self.timeout)
                ));
                warn!(source = source.name(), error = %err, "Price refresh failed");
                return Err(err);
            }
        };

        let mut priced = 0;
        let mut missing = Vec::new();

        for holding in registry.holdings_mut() {
            match quotes.get(holding.provider_id()).copied().flatten() {
                Some(price) if !price.is_sign_negative() || price.is_zero() => {
                    holding.set_price(price);
                    priced += 1;
                }
                _ => {
                    holding.clear_price();
                    warn!(
                        symbol = holding.symbol(),
                        provider_id = holding.provider_id(),
                        "Could not fetch price"
                    );
                    missing.push(MissingPrice {
                        symbol: holding.symbol().to_string(),
                        provider_id: holding.provider_id().to_string(),
                    });
                }
            }
        }

        info!(
            source = source.name(),
            currency = %currency,
            requested = ids.len(),
            priced,
            missing = missing.len(),
            "Fetched prices"
        );

        Ok(RefreshOutcome::Fetched {
            requested: ids.len(),
            priced,
            missing,
        })
    }

    /// Sum of holding values; unpriced holdings count as zero. Clamps at
    /// `Decimal::MAX`.
    pub fn compute_total(&self, registry: &AssetRegistry) -> Decimal {
        saturating_sum(registry.holdings().iter().map(|h| h.total_value()))
    }

    /// Project the registry into display rows, in registry order.
    pub fn render(&self, registry: &AssetRegistry, currency: &str) -> Report {
        let rows = registry
            .holdings()
            .iter()
            .map(|holding| ReportRow {
                symbol: holding.symbol().to_string(),
                amount: format_report_value(holding.amount()),
                price: format_report_price(holding.price()),
                total: format_report_value(holding.total_value()),
            })
            .collect();

        Report {
            currency: normalize_display_currency(currency),
            rows,
            total: self.compute_total(registry),
        }
    }

    /// Build a persistable summary stamped with `clock.now()`.
    pub fn export_snapshot(
        &self,
        registry: &AssetRegistry,
        currency: &str,
        clock: &dyn Clock,
    ) -> SnapshotDocument {
        let assets = registry
            .holdings()
            .iter()
            .map(|holding| SnapshotEntry {
                symbol: holding.symbol().to_string(),
                amount: holding.amount(),
                price: holding.price().into(),
                total_value: holding.total_value(),
            })
            .collect();

        SnapshotDocument {
            currency: normalize_display_currency(currency),
            timestamp: clock.now(),
            assets,
        }
    }
}

fn normalize_api_currency(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_display_currency(value: &str) -> String {
    value.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::market_data::{PriceQuotes, StaticPriceSource};
    use crate::portfolio::SymbolTable;
    use crate::valuation::SnapshotPrice;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns a fixed response and records what it was asked for.
    struct ScriptedSource {
        response: Mutex<Option<Result<PriceQuotes, PriceSourceError>>>,
        calls: AtomicUsize,
        last_ids: Mutex<Option<BTreeSet<String>>>,
        last_currency: Mutex<Option<String>>,
    }

    impl ScriptedSource {
        fn new(response: Result<PriceQuotes, PriceSourceError>) -> Self {
            Self {
                response: Mutex::new(Some(response)),
                calls: AtomicUsize::new(0),
                last_ids: Mutex::new(None),
                last_currency: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl PriceSource for ScriptedSource {
        async fn get_prices(
            &self,
            ids: &BTreeSet<String>,
            currency: &str,
        ) -> Result<PriceQuotes, PriceSourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_ids.lock().unwrap() = Some(ids.clone());
            *self.last_currency.lock().unwrap() = Some(currency.to_string());
            self.response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(PriceSourceError::Other("script exhausted".into())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Never answers.
    struct HangingSource;

    #[async_trait::async_trait]
    impl PriceSource for HangingSource {
        async fn get_prices(
            &self,
            _ids: &BTreeSet<String>,
            _currency: &str,
        ) -> Result<PriceQuotes, PriceSourceError> {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "hanging"
        }
    }

    fn registry(entries: &[(&str, i64)]) -> AssetRegistry {
        let mut registry = AssetRegistry::new(SymbolTable::builtin());
        for (symbol, amount) in entries {
            registry.add(symbol, Decimal::from(*amount)).unwrap();
        }
        registry
    }

    fn quotes(entries: &[(&str, Option<i64>)]) -> PriceQuotes {
        entries
            .iter()
            .map(|(id, price)| (id.to_string(), price.map(Decimal::from)))
            .collect()
    }

    #[tokio::test]
    async fn test_refresh_prices_and_totals() {
        let mut registry = registry(&[("BTC", 2), ("ETH", 1)]);
        let source = StaticPriceSource::new()
            .with_price("bitcoin", Decimal::from(50_000))
            .with_price("ethereum", Decimal::from(3_000));
        let engine = ValuationEngine::new();

        let outcome = engine.refresh(&mut registry, "usd", &source).await.unwrap();

        assert_eq!(
            outcome,
            RefreshOutcome::Fetched {
                requested: 2,
                priced: 2,
                missing: Vec::new(),
            }
        );
        assert_eq!(engine.compute_total(&registry), Decimal::from(103_000));
    }

    #[tokio::test]
    async fn test_refresh_sends_one_deduplicated_lowercase_request() {
        let mut registry = registry(&[("BTC", 1), ("btc", 3), ("ETH", 1)]);
        let source = ScriptedSource::new(Ok(quotes(&[
            ("bitcoin", Some(10)),
            ("ethereum", Some(2)),
        ])));
        let engine = ValuationEngine::new();

        engine.refresh(&mut registry, " USD ", &source).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        let ids = source.last_ids.lock().unwrap().clone().unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(source.last_currency.lock().unwrap().as_deref(), Some("usd"));
        assert!(registry.holdings().iter().all(|h| h.price().is_some()));
        assert_eq!(engine.compute_total(&registry), Decimal::from(42));
    }

    #[tokio::test]
    async fn test_null_price_is_a_per_asset_warning() {
        let mut registry = registry(&[("BTC", 1)]);
        let source = ScriptedSource::new(Ok(quotes(&[("bitcoin", None)])));
        let engine = ValuationEngine::new();

        let outcome = engine.refresh(&mut registry, "usd", &source).await.unwrap();

        assert_eq!(
            outcome.missing(),
            &[MissingPrice {
                symbol: "BTC".to_string(),
                provider_id: "bitcoin".to_string(),
            }]
        );
        assert!(registry.holdings()[0].price().is_none());
        assert_eq!(engine.compute_total(&registry), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_missing_id_clears_previous_price() {
        let mut registry = registry(&[("BTC", 1), ("ETH", 2)]);
        let engine = ValuationEngine::new();

        let first = StaticPriceSource::new()
            .with_price("bitcoin", Decimal::from(100))
            .with_price("ethereum", Decimal::from(10));
        engine.refresh(&mut registry, "usd", &first).await.unwrap();
        assert_eq!(engine.compute_total(&registry), Decimal::from(120));

        let second = StaticPriceSource::new().with_price("bitcoin", Decimal::from(200));
        let outcome = engine.refresh(&mut registry, "usd", &second).await.unwrap();

        assert_eq!(outcome.missing().len(), 1);
        assert_eq!(registry.holdings()[0].price(), Some(Decimal::from(200)));
        assert_eq!(registry.holdings()[1].price(), None);
        assert_eq!(engine.compute_total(&registry), Decimal::from(200));
    }

    #[tokio::test]
    async fn test_negative_price_is_treated_as_missing() {
        let mut registry = registry(&[("BTC", 1)]);
        let source = ScriptedSource::new(Ok(quotes(&[("bitcoin", Some(-1))])));

        let outcome = ValuationEngine::new()
            .refresh(&mut registry, "usd", &source)
            .await
            .unwrap();

        assert_eq!(outcome.missing().len(), 1);
        assert!(registry.holdings()[0].price().is_none());
    }

    #[tokio::test]
    async fn test_empty_registry_makes_no_request() {
        let mut registry = registry(&[]);
        let source = ScriptedSource::new(Ok(PriceQuotes::new()));
        let engine = ValuationEngine::new();

        let outcome = engine.refresh(&mut registry, "usd", &source).await.unwrap();

        assert_eq!(outcome, RefreshOutcome::NothingToFetch);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.compute_total(&registry), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_failures_keep_prior_prices() {
        let engine = ValuationEngine::new();
        let cases = [
            (
                PriceSourceError::Connectivity("connection refused".into()),
                RefreshError::NetworkUnavailable("connection refused".into()),
            ),
            (
                PriceSourceError::Http {
                    status: 400,
                    body: "invalid vs_currency".into(),
                },
                RefreshError::Provider("HTTP 400: invalid vs_currency".into()),
            ),
            (
                PriceSourceError::Other("bad json".into()),
                RefreshError::Provider("bad json".into()),
            ),
        ];

        for (source_err, expected) in cases {
            let mut registry = registry(&[("BTC", 2), ("ETH", 1)]);
            let seed = StaticPriceSource::new().with_price("bitcoin", Decimal::from(50_000));
            engine.refresh(&mut registry, "usd", &seed).await.unwrap();
            let before = registry.holdings().to_vec();

            let failing = ScriptedSource::new(Err(source_err));
            let err = engine.refresh(&mut registry, "usd", &failing).await.unwrap_err();

            assert_eq!(err, expected);
            assert_eq!(registry.holdings(), before.as_slice());
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_connectivity_failure() {
        let mut registry = registry(&[("BTC", 1)]);
        let engine = ValuationEngine::new().with_timeout(Duration::from_millis(50));

        let err = engine
            .refresh(&mut registry, "usd", &HangingSource)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RefreshError::NetworkUnavailable("price request timed out after 50ms".into())
        );
        assert!(registry.holdings()[0].price().is_none());
    }

    #[tokio::test]
    async fn test_render_rows_and_idempotence() {
        let mut registry = registry(&[("BTC", 2), ("DOGE", 10)]);
        let source = StaticPriceSource::new().with_price("bitcoin", Decimal::from(50_000));
        let engine = ValuationEngine::new();
        engine.refresh(&mut registry, "usd", &source).await.unwrap();

        let report = engine.render(&registry, "usd");
        assert_eq!(report.currency, "USD");
        assert_eq!(
            report.rows,
            vec![
                ReportRow {
                    symbol: "BTC".into(),
                    amount: "2.000000".into(),
                    price: "50000.000000".into(),
                    total: "100000.000000".into(),
                },
                ReportRow {
                    symbol: "DOGE".into(),
                    amount: "10.000000".into(),
                    price: "N/A".into(),
                    total: "0.000000".into(),
                },
            ]
        );
        assert_eq!(report.total, Decimal::from(100_000));

        assert_eq!(engine.render(&registry, "usd"), report);
        assert_eq!(engine.compute_total(&registry), engine.compute_total(&registry));
    }

    #[test]
    fn test_compute_total_before_any_fetch() {
        let registry = registry(&[("BTC", 2), ("ETH", 1)]);
        assert_eq!(ValuationEngine::new().compute_total(&registry), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_export_snapshot() {
        let mut registry = registry(&[("BTC", 2), ("SOL", 3)]);
        let source = StaticPriceSource::new().with_price("bitcoin", Decimal::from(50_000));
        let engine = ValuationEngine::new();
        engine.refresh(&mut registry, "usd", &source).await.unwrap();

        let clock = FixedClock::at(2024, 1, 15, 9, 30, 0).unwrap();
        let doc = engine.export_snapshot(&registry, "usd", &clock);

        assert_eq!(doc.currency, "USD");
        assert_eq!(doc.timestamp, clock.now());
        assert_eq!(doc.assets.len(), 2);
        assert_eq!(doc.assets[0].symbol, "BTC");
        assert_eq!(doc.assets[0].price, SnapshotPrice::Available(Decimal::from(50_000)));
        assert_eq!(doc.assets[0].total_value, Decimal::from(100_000));
        assert_eq!(doc.assets[1].price, SnapshotPrice::Unavailable);
        assert_eq!(doc.assets[1].total_value, Decimal::ZERO);
        assert_eq!(doc.total_value(), engine.compute_total(&registry));
    }
}
