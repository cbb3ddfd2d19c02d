use crate::adapters::http::{HttpTransport, DEFAULT_BASE_URL, DEFAULT_LANGUAGE};
use crate::adapters::memory_cache::MemoryCache;
use crate::core::cache_key::{CacheKeyCodec, DEFAULT_NAMESPACE};
use crate::core::caching::CachingOrchestrator;
use crate::core::engine::{AggregationEngine, Region};
use crate::utils::error::{ComexError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 應用程式設定；所有區段皆可省略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub upstream: UpstreamConfig,
    pub region: RegionConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub language: String,
    pub accept_invalid_certs: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    pub filter: String,
    pub id: i64,
    pub name: String,
}

impl Default for RegionConfig {
    fn default() -> Self {
        let region = Region::default();
        Self {
            filter: region.filter,
            id: region.id,
            name: region.name,
        }
    }
}

impl From<&RegionConfig> for Region {
    fn from(config: &RegionConfig) -> Self {
        Region {
            filter: config.filter.clone(),
            id: config.id,
            name: config.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub namespace: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ComexError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ComexError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${COMEXSTAT_BASE_URL})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ComexError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        // 替換後仍留有 ${VAR} 表示環境變數未設定
        for (field, value) in [
            ("upstream.base_url", &self.upstream.base_url),
            ("upstream.language", &self.upstream.language),
            ("region.name", &self.region.name),
        ] {
            if value.contains("${") {
                return Err(ComexError::MissingConfigError {
                    field: format!("{} ({})", field, value),
                });
            }
        }

        validate_url("upstream.base_url", &self.upstream.base_url)?;
        validate_non_empty_string("upstream.language", &self.upstream.language)?;

        validate_non_empty_string("region.filter", &self.region.filter)?;
        validate_non_empty_string("region.name", &self.region.name)?;
        if self.region.id <= 0 {
            return Err(ComexError::InvalidConfigValueError {
                field: "region.id".to_string(),
                value: self.region.id.to_string(),
                reason: "Region id must be a positive integer".to_string(),
            });
        }

        if self.cache.namespace.contains(':') {
            return Err(ComexError::InvalidConfigValueError {
                field: "cache.namespace".to_string(),
                value: self.cache.namespace.clone(),
                reason: "Namespace must not contain ':'".to_string(),
            });
        }
        validate_non_empty_string("cache.namespace", &self.cache.namespace)?;

        Ok(())
    }

    pub fn caching(&self) -> CachingOrchestrator {
        if self.cache.enabled {
            CachingOrchestrator::new(Arc::new(MemoryCache::new()))
        } else {
            tracing::info!("🗄️ Cache disabled by configuration");
            CachingOrchestrator::disabled()
        }
    }

    /// 依設定組裝 HTTP transport、快取與區域
    pub fn build_engine(&self) -> Result<AggregationEngine<HttpTransport>> {
        self.validate_config()?;

        let transport = HttpTransport::new(
            &self.upstream.base_url,
            &self.upstream.language,
            self.upstream.accept_invalid_certs,
        )?;

        Ok(AggregationEngine::new(transport, self.caching())
            .with_region(Region::from(&self.region))
            .with_key_codec(CacheKeyCodec::new(self.cache.namespace.clone())))
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
