// 外部系統的具體實作：上游 HTTP 與快取儲存

pub mod http;
pub mod memory_cache;

pub use http::HttpTransport;
pub use memory_cache::MemoryCache;
