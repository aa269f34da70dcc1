//! Ticker symbol to CoinGecko id mapping.
//!
//! The built-in table covers common cryptocurrencies. Config-supplied
//! overrides are merged once at construction; the table is read-only after
//! that.

use std::collections::{BTreeMap, HashMap};

/// Maps a lowercase ticker to its built-in CoinGecko coin id.
fn builtin_provider_id(symbol_lower: &str) -> Option<&'static str> {
    let id = match symbol_lower {
        // Major cryptocurrencies
        "btc" => "bitcoin",
        "eth" => "ethereum",
        "usdt" => "tether",
        "usdc" => "usd-coin",
        "bnb" => "binancecoin",
        "xrp" => "ripple",
        "ada" => "cardano",
        "doge" => "dogecoin",
        "sol" => "solana",
        "dot" => "polkadot",
        "matic" | "pol" => "matic-network",
        "ltc" => "litecoin",
        "shib" => "shiba-inu",
        "trx" => "tron",
        "avax" => "avalanche-2",
        "dai" => "dai",
        "link" => "chainlink",
        "atom" => "cosmos",
        "uni" => "uniswap",
        "etc" => "ethereum-classic",
        "xlm" => "stellar",
        "bch" => "bitcoin-cash",
        "algo" => "algorand",
        "fil" => "filecoin",
        "near" => "near",
        "apt" => "aptos",
        "xmr" => "monero",
        "xtz" => "tezos",
        // Layer 2
        "arb" => "arbitrum",
        "op" => "optimism",
        // DeFi
        "aave" => "aave",
        "mkr" => "maker",
        "crv" => "curve-dao-token",
        "comp" => "compound-governance-token",
        // Wrapped and staked
        "wbtc" => "wrapped-bitcoin",
        "weth" => "weth",
        "steth" => "staked-ether",
        _ => return None,
    };
    Some(id)
}

/// Every ticker the built-in table knows, in display order.
const BUILTIN_SYMBOLS: &[&str] = &[
    "btc", "eth", "usdt", "usdc", "bnb", "xrp", "ada", "doge", "sol", "dot", "matic", "pol", "ltc",
    "shib", "trx", "avax", "dai", "link", "atom", "uni", "etc", "xlm", "bch", "algo", "fil",
    "near", "apt", "xmr", "xtz", "arb", "op", "aave", "mkr", "crv", "comp", "wbtc", "weth",
    "steth",
];

fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_lowercase()
}

/// Immutable ticker → provider id lookup.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// Lowercase ticker → provider id, checked before the built-in table.
    overrides: HashMap<String, String>,
}

impl SymbolTable {
    /// Table with only the built-in mappings.
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Table with extra mappings layered over the built-ins.
    ///
    /// Override keys are matched case-insensitively. Entries with an empty
    /// ticker or id are ignored.
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let overrides = overrides
            .into_iter()
            .filter_map(|(symbol, id)| {
                let symbol = normalize_symbol(symbol.as_ref());
                let id = id.as_ref().trim().to_string();
                (!symbol.is_empty() && !id.is_empty()).then_some((symbol, id))
            })
            .collect();
        Self { overrides }
    }

    /// Resolve a ticker (any case) to its provider id.
    pub fn provider_id(&self, symbol: &str) -> Option<&str> {
        let symbol = normalize_symbol(symbol);
        if let Some(id) = self.overrides.get(&symbol) {
            return Some(id.as_str());
        }
        builtin_provider_id(&symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.provider_id(symbol).is_some()
    }

    /// All known tickers (lowercase) with their provider ids, sorted by ticker.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let mut entries: BTreeMap<String, String> = BUILTIN_SYMBOLS
            .iter()
            .filter_map(|symbol| {
                builtin_provider_id(symbol).map(|id| (symbol.to_string(), id.to_string()))
            })
            .collect();
        for (symbol, id) in &self.overrides {
            entries.insert(symbol.clone(), id.clone());
        }
        entries
    }
}
