use std::collections::BTreeSet;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::{Holding, SymbolTable};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown cryptocurrency symbol: {0}")]
    InvalidSymbol(String),
    #[error("Invalid amount {0:?}: {1}")]
    InvalidAmount(String, AmountIssue),
}

/// Why an amount was rejected.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
pub enum AmountIssue {
    #[error("amount must be a positive number")]
    NotPositive,
    #[error("amount is not a number")]
    NotANumber,
    #[error("amount is too large")]
    TooLarge,
    #[error("amount has more than 28 decimal places")]
    TooPrecise,
}

/// Ordered, append-only collection of validated holdings.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    symbols: SymbolTable,
    holdings: Vec<Holding>,
}

impl AssetRegistry {
    pub fn new(symbols: SymbolTable) -> Self {
        Self {
            symbols,
            holdings: Vec::new(),
        }
    }

    /// Validate and append a holding.
    ///
    /// The amount is checked before the symbol so that a bad amount is
    /// reported even for an unknown ticker. Nothing is stored on error.
    pub fn add(&mut self, symbol: &str, amount: Decimal) -> Result<&Holding, RegistryError> {
        if amount <= Decimal::ZERO {
            return Err(RegistryError::InvalidAmount(
                amount.to_string(),
                AmountIssue::NotPositive,
            ));
        }

        let provider_id = self
            .symbols
            .provider_id(symbol)
            .ok_or_else(|| RegistryError::InvalidSymbol(symbol.trim().to_string()))?
            .to_string();

        self.holdings.push(Holding::new(symbol, amount, provider_id));
        let added = self.holdings.len() - 1;
        Ok(&self.holdings[added])
    }

    /// Like [`AssetRegistry::add`], parsing a user-typed amount first.
    ///
    /// Accepts plain decimals ("0.5") and scientific notation ("1e-3").
    pub fn add_str(&mut self, symbol: &str, raw_amount: &str) -> Result<&Holding, RegistryError> {
        let amount = parse_amount(raw_amount)?;
        self.add(symbol, amount)
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub(crate) fn holdings_mut(&mut self) -> &mut [Holding] {
        &mut self.holdings
    }

    /// Distinct provider ids across all holdings, sorted.
    pub fn provider_ids(&self) -> BTreeSet<String> {
        self.holdings
            .iter()
            .map(|h| h.provider_id().to_string())
            .collect()
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, RegistryError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| RegistryError::InvalidAmount(trimmed.to_string(), classify_unparsed(trimmed)))
}

/// Tell a real number outside the `Decimal` range apart from garbage.
fn classify_unparsed(raw: &str) -> AmountIssue {
    match raw.parse::<f64>() {
        Ok(value) if !value.is_finite() => AmountIssue::NotANumber,
        Ok(value) if value <= 0.0 => AmountIssue::NotPositive,
        Ok(value) if value >= 1.0 => AmountIssue::TooLarge,
        Ok(_) => AmountIssue::TooPrecise,
        Err(_) => AmountIssue::NotANumber,
    }
}
