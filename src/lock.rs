//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于存储后端的分布式互斥锁。

use crate::backend::StoreBackend;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

const LOCK_PREFIX: &str = "lock:";

/// 分布式互斥锁
///
/// 以 SET NX PX 获取，以服务端原子比较删除释放。
/// 锁的value是每个实例唯一的owner token，防止过期后误删他人持有的锁。
/// 不可重入；TTL到期后锁自动失效，持有者崩溃不会造成永久死锁。
pub struct KeyedMutex {
    backend: Arc<dyn StoreBackend>,
    key: String,
    token: String,
}

impl KeyedMutex {
    /// 创建名为 `name` 的锁实例，键布局为 `lock:<name>`
    pub fn new(backend: Arc<dyn StoreBackend>, name: impl Into<String>) -> Self {
        Self {
            backend,
            key: format!("{}{}", LOCK_PREFIX, name.into()),
            token: Uuid::new_v4().simple().to_string(),
        }
    }

    /// 尝试获取锁
    ///
    /// 返回false表示锁被他人持有，属于正常的竞争结果而非错误；
    /// 调用方应稍后重试或直接拒绝请求，绝不阻塞等待。
    pub async fn acquire(&self, ttl: Duration) -> Result<bool> {
        let acquired = self.backend.set_nx_px(&self.key, &self.token, ttl).await?;
        debug!(key = %self.key, acquired, "lock acquisition attempt");
        Ok(acquired)
    }

    /// 释放锁
    ///
    /// 仅当存储中的token与本实例一致时删除；
    /// 非持有者调用是无副作用的no-op，返回false。
    pub async fn release(&self) -> Result<bool> {
        let released = self.backend.del_if_match(&self.key, &self.token).await?;
        if !released {
            debug!(key = %self.key, "release skipped, lock not held by this owner");
        }
        Ok(released)
    }

    /// 锁的owner token，测试与诊断用
    pub fn token(&self) -> &str {
        &self.token
    }
}
