//! Configuration, paths, and the fetch cache.

pub mod cache;
pub mod config;
pub mod paths;

pub use cache::{CacheEntry, CacheKey, FetchCache};
pub use config::{Config, ConfigSource, ResolvedConfig};
pub use paths::AppPaths;
