//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键值存储后端的接口。
//!
//! 工具箱依赖的存储原语：原子自增、set-if-absent、集合成员判断，
//! 以及两段必须在服务端原子执行的脚本（比较删除、秒杀准入）。

pub mod memory;
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::MemoryBackend;
pub use redis::RedisBackend;

/// 秒杀库存键
pub fn stock_key(voucher_id: u64) -> String {
    format!("seckill:stock:{}", voucher_id)
}

/// 秒杀已下单用户集合键
pub fn order_set_key(voucher_id: u64) -> String {
    format!("seckill:order:{}", voucher_id)
}

/// 存储后端特征
///
/// 键值协作方的契约。所有方法按单次往返建模；
/// `del_if_match` 与 `seckill_admit` 在实现侧必须是原子的。
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// 读取键值，不存在时返回None
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入键值，物理上永不过期（逻辑过期条目使用）
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// 写入键值并设置过期时间
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// SET NX PX：键不存在时写入并设置过期，返回是否写入成功
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// 原子自增，返回自增后的值
    async fn incr(&self, key: &str) -> Result<i64>;

    /// 删除键
    async fn del(&self, key: &str) -> Result<()>;

    /// 原子比较删除：仅当存储值等于token时删除键，返回是否删除
    ///
    /// 用于锁的安全释放，比较与删除必须在服务端原子执行。
    async fn del_if_match(&self, key: &str, token: &str) -> Result<bool>;

    /// 秒杀准入检查，单次原子执行
    ///
    /// 返回码：0=准入，1=库存不足，2=重复下单
    async fn seckill_admit(&self, voucher_id: u64, user_id: u64) -> Result<i64>;
}
