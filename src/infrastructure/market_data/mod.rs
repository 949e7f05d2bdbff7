pub mod alpaca;
pub mod cached;
pub mod synthetic;

pub use alpaca::AlpacaMarketDataService;
pub use cached::CachedMarketDataService;
pub use synthetic::SyntheticMarketDataService;
