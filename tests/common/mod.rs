//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了集成测试的通用工具函数和设置。

#![allow(dead_code)]

use oxflash::backend::MemoryBackend;
use oxflash::config::CacheConfig;
use oxflash::serialization::JsonSerializer;
use oxflash::CacheStore;
use serde::{Deserialize, Serialize};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 测试用实体
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct Shop {
    pub id: u64,
    pub name: String,
}

impl Shop {
    pub fn sample(id: u64) -> Self {
        Self {
            id,
            name: format!("shop-{}", id),
        }
    }
}

/// 基于进程内后端构造缓存层
pub fn memory_cache_store(
    config: CacheConfig,
) -> (std::sync::Arc<MemoryBackend>, CacheStore<JsonSerializer>) {
    let backend = std::sync::Arc::new(MemoryBackend::new());
    let store = CacheStore::new(backend.clone(), JsonSerializer::new(), &config);
    (backend, store)
}
