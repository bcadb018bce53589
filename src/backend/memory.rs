//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内存储后端，用于测试和本地开发。
//!
//! 所有操作共享一把互斥锁，从而获得与服务端脚本相同的原子性保证；
//! 过期采用惰性判断。

use crate::backend::{order_set_key, stock_key, StoreBackend};
use crate::error::{FlashError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn live(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() < deadline,
            None => true,
        }
    }
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
}

impl State {
    fn live_entry(&mut self, key: &str) -> Option<&Entry> {
        if let Some(entry) = self.strings.get(key) {
            if !entry.live() {
                self.strings.remove(key);
                return None;
            }
        }
        self.strings.get(key)
    }
}

/// 进程内存储后端
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // 持锁期间从不panic，中毒视为不可达
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut state = self.lock();
        Ok(state.live_entry(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.lock().strings.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        self.lock().strings.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn set_nx_px(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut state = self.lock();
        if state.live_entry(key).is_some() {
            return Ok(false);
        }
        state.strings.insert(
            key.to_string(),
            Entry {
                value: value.as_bytes().to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut state = self.lock();
        let current = match state.live_entry(key) {
            Some(entry) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or_else(|| {
                    FlashError::Backend(format!("value at {} is not an integer", key))
                })?,
            None => 0,
        };
        let next = current + 1;
        state.strings.insert(
            key.to_string(),
            Entry {
                value: next.to_string().into_bytes(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut state = self.lock();
        state.strings.remove(key);
        state.sets.remove(key);
        Ok(())
    }

    async fn del_if_match(&self, key: &str, token: &str) -> Result<bool> {
        let mut state = self.lock();
        let matches = state
            .live_entry(key)
            .map(|e| e.value == token.as_bytes())
            .unwrap_or(false);
        if matches {
            state.strings.remove(key);
        }
        Ok(matches)
    }

    async fn seckill_admit(&self, voucher_id: u64, user_id: u64) -> Result<i64> {
        let mut state = self.lock();
        let stock = state
            .live_entry(&stock_key(voucher_id))
            .and_then(|e| std::str::from_utf8(&e.value).ok()?.parse::<i64>().ok())
            .unwrap_or(0);
        if stock <= 0 {
            return Ok(1);
        }
        let members = state.sets.entry(order_set_key(voucher_id)).or_default();
        if members.contains(&user_id.to_string()) {
            return Ok(2);
        }
        members.insert(user_id.to_string());
        state.strings.insert(
            stock_key(voucher_id),
            Entry {
                value: (stock - 1).to_string().into_bytes(),
                expires_at: None,
            },
        );
        Ok(0)
    }
}
