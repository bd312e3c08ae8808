pub mod aggregator;
pub mod dashboard;
pub mod refresher;

pub use aggregator::{
    AggregatorError, BalanceSource, CachedBalanceSource, PlaidBalanceSource, StaticBalanceSource,
};
pub use refresher::BalanceRefresher;
