pub mod balance_cache_repository;
pub mod item_repository;
pub mod transaction_repository;

pub use balance_cache_repository::{BalanceCacheRepository, PostgresBalanceCacheRepository};
pub use item_repository::{ItemRepository, PostgresItemRepository};
pub use transaction_repository::{PostgresTransactionRepository, TransactionRepository};
