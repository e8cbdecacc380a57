pub mod db;
pub mod memory_cache;

pub use db::DbAdapter;
pub use memory_cache::InMemoryCache;
