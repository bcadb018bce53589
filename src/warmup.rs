//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块提供热键预热辅助。
//!
//! 逻辑过期模式只服务预热过的键，进程启动时应对预知的热点数据
//! 批量执行一次`put_logical`。单个键的失败只计数不中断。

use crate::cache::CacheStore;
use crate::error::Result;
use crate::serialization::Serializer;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// 预热结果统计
#[derive(Debug, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub loaded: usize,
    pub failed: usize,
}

/// 对一批热键执行逻辑过期预热
pub async fn warm_logical<S, T, F, Fut, I>(
    cache: &CacheStore<S>,
    entity: &str,
    ids: I,
    logical_ttl: Duration,
    load: F,
) -> WarmupReport
where
    S: Serializer + Clone + Send + Sync + 'static,
    T: Serialize + DeserializeOwned,
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
    I: IntoIterator<Item = String>,
{
    let mut report = WarmupReport::default();
    for id in ids {
        match load(id.clone()).await {
            Ok(Some(value)) => match cache.put_logical(entity, &id, &value, logical_ttl).await {
                Ok(()) => report.loaded += 1,
                Err(e) => {
                    warn!(entity, id = %id, "warmup write failed: {}", e);
                    report.failed += 1;
                }
            },
            Ok(None) => {
                warn!(entity, id = %id, "no source row for hot key, skipping warmup");
                report.failed += 1;
            }
            Err(e) => {
                warn!(entity, id = %id, "warmup load failed: {}", e);
                report.failed += 1;
            }
        }
    }
    info!(
        entity,
        loaded = report.loaded,
        failed = report.failed,
        "cache warmup finished"
    );
    report
}
