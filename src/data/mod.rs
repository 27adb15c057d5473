//! Data module - fetching, reshaping, and aggregation

pub mod aggregator;
pub mod fetcher;
pub mod reshaper;

pub use aggregator::{Aggregator, CountrySeries};
pub use fetcher::{DataFetcher, RawTables};
pub use reshaper::Reshaper;
