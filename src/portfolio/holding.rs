use rust_decimal::Decimal;

/// One tracked asset position.
///
/// Amount and provider id are fixed at creation. The price starts absent and
/// only changes through [`Holding::set_price`] / [`Holding::clear_price`],
/// which the valuation engine calls after a fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    symbol: String,
    amount: Decimal,
    provider_id: String,
    price: Option<Decimal>,
}

impl Holding {
    /// Callers must have validated `amount > 0` and resolved `provider_id`.
    pub(crate) fn new(symbol: &str, amount: Decimal, provider_id: impl Into<String>) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            amount,
            provider_id: provider_id.into(),
            price: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn price(&self) -> Option<Decimal> {
        self.price
    }

    pub fn is_priced(&self) -> bool {
        self.price.is_some()
    }

    /// `amount * price`, or zero while no price is known. A product beyond
    /// the `Decimal` range saturates at `Decimal::MAX`.
    pub fn total_value(&self) -> Decimal {
        match self.price {
            Some(price) => self.amount.checked_mul(price).unwrap_or(Decimal::MAX),
            None => Decimal::ZERO,
        }
    }

    /// Negative prices are treated as unavailable.
    pub(crate) fn set_price(&mut self, price: Decimal) {
        self.price = if price.is_sign_negative() && !price.is_zero() {
            None
        } else {
            Some(price)
        };
    }

    pub(crate) fn clear_price(&mut self) {
        self.price = None;
    }
}
