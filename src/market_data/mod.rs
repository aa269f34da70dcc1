#[cfg(feature = "coingecko")]
pub mod providers;
mod source;

pub use source::{PriceQuotes, PriceSource, PriceSourceError, StaticPriceSource};
