use crate::domain::ports::CacheStore;
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 所有實體共用的 TTL: 24 小時
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Get-or-compute 包裝。
///
/// 同一個 key 的並行 miss 會各自執行 resolver 並各自寫入快取，最後寫入者為準；
/// 這裡刻意不做 single-flight。
#[derive(Clone)]
pub struct CachingOrchestrator {
    store: Option<Arc<dyn CacheStore>>,
    ttl: Duration,
}

impl CachingOrchestrator {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            ttl: CACHE_TTL,
        }
    }

    /// 沒有快取後端時每次都直接計算
    pub fn disabled() -> Self {
        Self {
            store: None,
            ttl: CACHE_TTL,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, resolver: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(store) = &self.store else {
            return resolver().await;
        };

        if let Some(raw) = store.get(key).await? {
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    tracing::debug!("🗄️ Cache hit: {}", key);
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Ignoring undecodable cache entry {}: {}", key, e);
                }
            }
        } else {
            tracing::debug!("🗄️ Cache miss: {}", key);
        }

        // resolver 失敗時直接回傳錯誤，不寫入快取
        let value = resolver().await?;
        let serialized = serde_json::to_string(&value)?;
        store.set(key, serialized, self.ttl).await?;
        Ok(value)
    }
}

impl std::fmt::Debug for CachingOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingOrchestrator")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish()
    }
}
