pub mod aggregate;
pub mod cache_key;
pub mod caching;
pub mod engine;
pub mod period;
pub mod upstream;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::ports::{CacheStore, Clock, UpstreamTransport};
pub use crate::utils::error::Result;
