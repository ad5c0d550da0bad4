use serde::{Deserialize, Serialize};

/// Engine configuration, passed explicitly into constructors. No
/// ambient global lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rounding precision applied to decimal and calculated values.
    pub decimal_precision: u32,
    pub cache_config: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the built-schema LRU cache.
    pub schema_cache_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decimal_precision: 2,
            cache_config: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            schema_cache_size: 128,
        }
    }
}

impl EngineConfig {
    pub fn with_decimal_precision(mut self, decimal_precision: u32) -> Self {
        self.decimal_precision = decimal_precision;
        self
    }

    pub fn with_cache_config(mut self, cache_config: CacheConfig) -> Self {
        self.cache_config = cache_config;
        self
    }
}

impl CacheConfig {
    pub fn minimal() -> Self {
        Self {
            schema_cache_size: 8,
        }
    }
}
