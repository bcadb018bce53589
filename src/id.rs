//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于存储后端计数器的全局递增ID生成器。

use crate::backend::StoreBackend;
use crate::error::Result;
use chrono::Utc;
use std::sync::Arc;

/// 纪元起点：2023-01-01T00:00:00Z
const ID_EPOCH: i64 = 1_672_531_200;

/// 序列号占用的位数
const SEQUENCE_BITS: u32 = 32;

/// 全局递增ID生成器
///
/// 63位ID = 符号位(0) + 31位纪元秒数 + 32位当日序列号。
/// 序列计数器按 `seq:<namespace>:<YYYY:MM:DD>` 逐日分键，
/// 唯一性完全依赖存储侧自增的原子性，不依赖本机状态，
/// 代价是每个ID一次存储往返，换来免除时钟偏移协调问题。
pub struct IdGenerator {
    backend: Arc<dyn StoreBackend>,
}

impl IdGenerator {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// 生成下一个ID
    ///
    /// 同一进程同一自然日内严格递增（前提是计数存储单调）。
    pub async fn next_id(&self, namespace: &str) -> Result<i64> {
        let now = Utc::now();
        let elapsed = now.timestamp() - ID_EPOCH;
        let day = now.format("%Y:%m:%d");
        let key = format!("seq:{}:{}", namespace, day);
        let sequence = self.backend.incr(&key).await?;
        Ok(elapsed << SEQUENCE_BITS | sequence)
    }
}
