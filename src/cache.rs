//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了带穿透、击穿、雪崩防护的旁路缓存层。
//!
//! 两种读取模式：
//! - 直通模式：未命中回源，源中不存在则写入短TTL的空值标记（穿透防护）；
//!   物理TTL带随机抖动（雪崩防护）。
//! - 逻辑过期模式：条目物理上永不过期，新鲜度由条目内的到期时间判断；
//!   过期后由持锁的后台任务重建，读取方立即返回当前（可能陈旧的）值，
//!   绝不阻塞在重建上（热键击穿防护）。

use crate::backend::StoreBackend;
use crate::config::CacheConfig;
use crate::error::{FlashError, Result};
use crate::lock::KeyedMutex;
use crate::serialization::Serializer;
use chrono::Utc;
use futures::FutureExt;
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

/// 逻辑过期条目的存储信封
///
/// 信封本身固定为JSON编码，payload是调用方序列化器产出的字节。
#[derive(Serialize, Deserialize)]
struct LogicalEntry {
    expire_at_ms: i64,
    payload: Vec<u8>,
}

fn cache_key(entity: &str, id: &str) -> String {
    format!("cache:{}:{}", entity, id)
}

fn rebuild_lock_name(entity: &str, id: &str) -> String {
    format!("{}:{}", entity, id)
}

fn encode_entry(entry: &LogicalEntry) -> Result<Vec<u8>> {
    serde_json::to_vec(entry).map_err(|e| FlashError::Serialization(e.to_string()))
}

fn decode_entry(raw: &[u8]) -> Result<LogicalEntry> {
    serde_json::from_slice(raw).map_err(|e| FlashError::Serialization(e.to_string()))
}

/// 旁路缓存
///
/// 泛型于序列化器，由调用方在构造时显式选择；
/// 读取时的回源逻辑由调用方以loader闭包提供。
pub struct CacheStore<S> {
    backend: Arc<dyn StoreBackend>,
    serializer: S,
    rebuild_permits: Arc<Semaphore>,
    null_ttl: Duration,
    lock_ttl: Duration,
    ttl_jitter: f64,
}

impl<S> CacheStore<S>
where
    S: Serializer + Clone + Send + Sync + 'static,
{
    pub fn new(backend: Arc<dyn StoreBackend>, serializer: S, config: &CacheConfig) -> Self {
        Self {
            backend,
            serializer,
            rebuild_permits: Arc::new(Semaphore::new(config.rebuild_workers)),
            null_ttl: Duration::from_secs(config.null_ttl_secs),
            lock_ttl: Duration::from_secs(config.lock_ttl_secs),
            ttl_jitter: config.ttl_jitter,
        }
    }

    /// 对物理TTL施加随机正向抖动，避免同批键同时过期
    fn jittered(&self, ttl: Duration) -> Duration {
        if self.ttl_jitter <= 0.0 {
            return ttl;
        }
        let factor = rand::thread_rng().gen_range(0.0..self.ttl_jitter);
        ttl + ttl.mul_f64(factor)
    }

    /// 直通模式读取（穿透防护）
    ///
    /// 命中空值标记时直接返回None，不触发回源。
    /// 回源结果为None时写入短TTL的空值标记。
    pub async fn get<T, F, Fut>(
        &self,
        entity: &str,
        id: &str,
        ttl: Duration,
        load: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let key = cache_key(entity, id);
        if let Some(raw) = self.backend.get(&key).await? {
            if raw.is_empty() {
                debug!(key = %key, "pass-through hit on cached absence marker");
                return Ok(None);
            }
            return Ok(Some(self.serializer.deserialize(&raw)?));
        }
        match load(id.to_string()).await? {
            Some(value) => {
                let bytes = self.serializer.serialize(&value)?;
                self.backend
                    .set_ex(&key, bytes, self.jittered(ttl))
                    .await?;
                Ok(Some(value))
            }
            None => {
                debug!(key = %key, "loader found nothing, caching absence marker");
                self.backend.set_ex(&key, Vec::new(), self.null_ttl).await?;
                Ok(None)
            }
        }
    }

    /// 逻辑过期模式读取（热键击穿防护）
    ///
    /// 条目需要预热（见[`put_logical`](Self::put_logical)），冷键直接返回None且不重建。
    /// 条目过期时尝试获取重建锁并把重建交给有界工作池，
    /// 无论是否拿到锁，本次调用都立即返回当前缓存值。
    pub async fn get_logical<T, F, Fut>(
        &self,
        entity: &str,
        id: &str,
        logical_ttl: Duration,
        load: F,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        let key = cache_key(entity, id);
        let raw = match self.backend.get(&key).await? {
            Some(raw) => raw,
            // 冷键：逻辑过期模式只服务预热过的热点数据
            None => return Ok(None),
        };
        let entry = decode_entry(&raw)?;
        let value: T = self.serializer.deserialize(&entry.payload)?;
        if entry.expire_at_ms > Utc::now().timestamp_millis() {
            return Ok(Some(value));
        }

        let lock = KeyedMutex::new(self.backend.clone(), rebuild_lock_name(entity, id));
        if lock.acquire(self.lock_ttl).await? {
            match self.rebuild_permits.clone().try_acquire_owned() {
                Ok(permit) => {
                    self.spawn_rebuild(key, id.to_string(), logical_ttl, load, lock, permit);
                }
                Err(_) => {
                    debug!(key = %key, "rebuild pool saturated, serving stale value");
                    if let Err(e) = lock.release().await {
                        warn!(key = %key, "failed to release rebuild lock: {}", e);
                    }
                }
            }
        }
        // 锁被并发重建者持有时不重复排队，直接返回陈旧值
        Ok(Some(value))
    }

    fn spawn_rebuild<T, F, Fut>(
        &self,
        key: String,
        id: String,
        logical_ttl: Duration,
        load: F,
        lock: KeyedMutex,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<T>>> + Send,
    {
        let backend = self.backend.clone();
        let serializer = self.serializer.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let rebuild = AssertUnwindSafe(async {
                match load(id).await? {
                    Some(fresh) => {
                        let payload = serializer.serialize(&fresh)?;
                        let entry = LogicalEntry {
                            expire_at_ms: Utc::now().timestamp_millis()
                                + logical_ttl.as_millis() as i64,
                            payload,
                        };
                        backend.set(&key, encode_entry(&entry)?).await?;
                        debug!(key = %key, "cache entry rebuilt");
                        Ok::<(), FlashError>(())
                    }
                    None => {
                        // 源中已无此行，保留陈旧条目由运维介入
                        warn!(key = %key, "loader found nothing during rebuild, keeping stale entry");
                        Ok(())
                    }
                }
            })
            .catch_unwind()
            .await;
            match rebuild {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(key = %key, "cache rebuild failed: {}", e),
                Err(_) => error!(key = %key, "cache rebuild panicked"),
            }
            if let Err(e) = lock.release().await {
                warn!(key = %key, "failed to release rebuild lock: {}", e);
            }
        });
    }

    /// 直通模式写入，TTL带抖动
    pub async fn put<T: Serialize>(
        &self,
        entity: &str,
        id: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let bytes = self.serializer.serialize(value)?;
        self.backend
            .set_ex(&cache_key(entity, id), bytes, self.jittered(ttl))
            .await
    }

    /// 逻辑过期模式写入，亦是热键预热的入口
    pub async fn put_logical<T: Serialize>(
        &self,
        entity: &str,
        id: &str,
        value: &T,
        logical_ttl: Duration,
    ) -> Result<()> {
        let entry = LogicalEntry {
            expire_at_ms: Utc::now().timestamp_millis() + logical_ttl.as_millis() as i64,
            payload: self.serializer.serialize(value)?,
        };
        self.backend
            .set(&cache_key(entity, id), encode_entry(&entry)?)
            .await
    }
}
