pub mod config;
pub mod engine;

pub use config::{CacheConfig, EngineConfig};
pub use engine::FormEngine;
