//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的存储后端实现。

use crate::backend::{order_set_key, stock_key, StoreBackend};
use crate::config::RedisConfig;
use crate::error::{FlashError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use redis::{aio::ConnectionManager, Client, Script};
use secrecy::ExposeSecret;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

lazy_static! {
    /// 比较删除脚本：仅当值与token一致时删除，保证释放锁的原子性
    static ref DEL_IF_MATCH_SCRIPT: Script = Script::new(
        r#"
        if redis.call("get", KEYS[1]) == ARGV[1] then
            return redis.call("del", KEYS[1])
        else
            return 0
        end
        "#,
    );

    /// 秒杀准入脚本：库存判断、重复下单判断、扣减与记录在单次往返内原子完成
    static ref SECKILL_SCRIPT: Script = Script::new(
        r#"
        local stock = tonumber(redis.call("get", KEYS[1]))
        if stock == nil or stock <= 0 then
            return 1
        end
        if redis.call("sismember", KEYS[2], ARGV[1]) == 1 then
            return 2
        end
        redis.call("incrby", KEYS[1], -1)
        redis.call("sadd", KEYS[2], ARGV[1])
        return 0
        "#,
    );
}

/// Redis存储后端
///
/// 基于ConnectionManager的单实例连接，自动重连；
/// 每条命令受配置的超时约束。
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisBackend")
    }
}

impl RedisBackend {
    /// 建立到Redis的连接
    #[instrument(skip(config), level = "info", name = "init_redis_backend")]
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.expose_secret())?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(FlashError::Backend(format!(
                    "Connection timed out after {}ms",
                    config.connection_timeout_ms
                )));
            }
        };
        debug!("Redis backend connected");
        Ok(Self {
            manager,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(res) => res.map_err(FlashError::from),
            Err(_) => Err(FlashError::Timeout(format!(
                "{} timed out after {}ms",
                op,
                self.command_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        self.run("GET", redis::cmd("GET").arg(key).query_async(&mut conn))
            .await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.manager.clone();
        self.run(
            "SET",
            redis::cmd("SET").arg(key).arg(value).query_async(&mut conn),
        )
        .await
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.manager.clone();
        self.run(
            "SET PX",
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("PX")
                .arg(ttl.as_millis() as u64)
                .query_async(&mut conn),
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.manager.clone();
        let result: Option<String> = self
            .run(
                "SET NX PX",
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("PX")
                    .arg(ttl.as_millis() as u64)
                    .query_async(&mut conn),
            )
            .await?;
        Ok(result.is_some())
    }

    #[instrument(skip(self), level = "debug")]
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.manager.clone();
        self.run("INCR", redis::cmd("INCR").arg(key).query_async(&mut conn))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        self.run("DEL", redis::cmd("DEL").arg(key).query_async(&mut conn))
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn del_if_match(&self, key: &str, token: &str) -> Result<bool> {
        let mut conn = self.manager.clone();
        let deleted: i64 = self
            .run(
                "del_if_match",
                DEL_IF_MATCH_SCRIPT
                    .key(key)
                    .arg(token)
                    .invoke_async(&mut conn),
            )
            .await?;
        Ok(deleted == 1)
    }

    #[instrument(skip(self), level = "debug")]
    async fn seckill_admit(&self, voucher_id: u64, user_id: u64) -> Result<i64> {
        let mut conn = self.manager.clone();
        self.run(
            "seckill_admit",
            SECKILL_SCRIPT
                .key(stock_key(voucher_id))
                .key(order_set_key(voucher_id))
                .arg(user_id.to_string())
                .invoke_async(&mut conn),
        )
        .await
    }
}
