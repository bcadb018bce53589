//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了工具箱的配置结构和解析逻辑。

use crate::error::{FlashError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub seckill: SeckillConfig,
}

impl Config {
    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| FlashError::Configuration(e.to_string()))
    }
}

/// Redis连接配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RedisConfig {
    /// 连接字符串（redis://...），作为机密处理
    pub url: SecretString,
    /// 建立连接的超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 单条命令的超时时间（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: SecretString::from(String::from("redis://127.0.0.1:6379")),
            connection_timeout_ms: 5000,
            command_timeout_ms: 2000,
        }
    }
}

/// 旁路缓存配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 空值标记的过期时间（秒），用于缓存穿透防护
    pub null_ttl_secs: u64,
    /// 逻辑过期重建工作池的并发上限
    pub rebuild_workers: usize,
    /// 重建互斥锁的过期时间（秒）
    pub lock_ttl_secs: u64,
    /// 物理TTL的随机抖动比例（0.0~1.0），用于缓存雪崩防护
    pub ttl_jitter: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            null_ttl_secs: 120,
            rebuild_workers: 10,
            lock_ttl_secs: 10,
            ttl_jitter: 0.1,
        }
    }
}

/// 秒杀管道配置
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeckillConfig {
    /// 订单任务队列容量，队列满时提交被显式拒绝
    pub queue_capacity: usize,
    /// 按用户加锁的过期时间（秒）
    pub order_lock_ttl_secs: u64,
}

impl Default for SeckillConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            order_lock_ttl_secs: 10,
        }
    }
}
