//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了订单仓储的契约。
//!
//! 关系型存储是外部协作方，本库只依赖这份窄契约；
//! ORM映射由应用层实现。

use crate::error::Result;
use crate::seckill::OrderTask;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// 订单仓储特征
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// 该用户是否已持久化过此优惠券的订单
    async fn has_order(&self, user_id: u64, voucher_id: u64) -> Result<bool>;

    /// 条件扣减权威库存：`stock = stock - 1 WHERE stock > 0`
    ///
    /// 返回是否扣减成功；非负性由存储侧保证而非应用逻辑。
    async fn decrement_stock(&self, voucher_id: u64) -> Result<bool>;

    /// 插入订单行
    async fn insert_order(&self, task: &OrderTask) -> Result<()>;
}

#[derive(Default)]
struct RepositoryState {
    stock: HashMap<u64, i64>,
    orders: Vec<OrderTask>,
}

/// 进程内订单仓储，测试和本地开发用
#[derive(Default)]
pub struct MemoryOrderRepository {
    state: Mutex<RepositoryState>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepositoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 设置某个优惠券的权威库存
    pub fn set_stock(&self, voucher_id: u64, stock: i64) {
        self.lock().stock.insert(voucher_id, stock);
    }

    /// 当前权威库存
    pub fn stock(&self, voucher_id: u64) -> i64 {
        self.lock().stock.get(&voucher_id).copied().unwrap_or(0)
    }

    /// 已持久化的订单快照
    pub fn orders(&self) -> Vec<OrderTask> {
        self.lock().orders.clone()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn has_order(&self, user_id: u64, voucher_id: u64) -> Result<bool> {
        Ok(self
            .lock()
            .orders
            .iter()
            .any(|o| o.user_id == user_id && o.voucher_id == voucher_id))
    }

    async fn decrement_stock(&self, voucher_id: u64) -> Result<bool> {
        let mut state = self.lock();
        match state.stock.get_mut(&voucher_id) {
            Some(stock) if *stock > 0 => {
                *stock -= 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_order(&self, task: &OrderTask) -> Result<()> {
        self.lock().orders.push(task.clone());
        Ok(())
    }
}
