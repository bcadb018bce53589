//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了并发工具箱的错误类型和处理机制。

use thiserror::Error;

/// 工具箱错误类型枚举
///
/// 定义了缓存、锁、ID生成和秒杀管道中可能发生的各种错误类型。
/// 注意：锁竞争失败、队列已满、售罄、重复下单等属于正常的业务结果，
/// 由各组件的返回值表达，不在此枚举之列。
#[derive(Error, Debug)]
pub enum FlashError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 后端存储操作失败
    #[error("Backend error: {0}")]
    Backend(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// 订单仓储错误
    #[error("Repository error: {0}")]
    Repository(String),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 关闭错误
    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

/// 工具箱操作结果类型别名
///
/// 简化错误处理，所有核心操作都返回此类型
pub type Result<T> = std::result::Result<T, FlashError>;
