use crate::domain::model::{UpstreamEnvelope, UpstreamQuery};
use crate::utils::error::{Result, TransportError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

/// 上游統計 API 的傳輸層 (`POST /general`)
pub trait UpstreamTransport: Send + Sync {
    fn send(
        &self,
        query: &UpstreamQuery,
    ) -> impl std::future::Future<Output = std::result::Result<UpstreamEnvelope, TransportError>> + Send;
}

/// Key-value 快取，值為序列化後的字串
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Utc::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
