pub mod coingecko;

pub use coingecko::CoinGeckoPriceSource;
