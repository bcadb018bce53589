//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存值的序列化机制。
//!
//! 缓存层不依赖类型反射，序列化能力由调用方在调用点显式选择。

pub mod json;

use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};

pub use json::JsonSerializer;

/// 序列化器特征
///
/// 定义序列化和反序列化操作的接口
pub trait Serializer: Send + Sync {
    /// 序列化值为字节数组
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// 从字节数组反序列化值
    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T>;
}
