//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了JSON序列化器的实现。

use super::Serializer;
use crate::error::{FlashError, Result};
use serde::{de::DeserializeOwned, Serialize};

/// JSON序列化器
///
/// 基于serde_json的序列化和反序列化实现
#[derive(Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| FlashError::Serialization(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        serde_json::from_slice(data).map_err(|e| FlashError::Serialization(e.to_string()))
    }
}
