//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了秒杀下单管道。
//!
//! 请求路径：服务端脚本原子完成库存与重复下单检查，通过后生成订单ID
//! 并投递到有界队列，调用立即返回订单ID；持久化由唯一的后台消费者
//! 在按用户加锁的前提下串行完成。单消费者将写库并发约束为同一时刻
//! 至多一个事务，也使按用户锁不可能与自身死锁。

pub mod repository;

use crate::backend::{order_set_key, stock_key, StoreBackend};
use crate::config::SeckillConfig;
use crate::error::{FlashError, Result};
use crate::id::IdGenerator;
use crate::lock::KeyedMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub use repository::{MemoryOrderRepository, OrderRepository};

/// 待持久化的订单任务
///
/// 由准入检查产生，经有界队列移交给消费者，恰好被消费一次。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTask {
    pub order_id: i64,
    pub user_id: u64,
    pub voucher_id: u64,
}

/// 提交结果
///
/// 售罄、重复下单和队列已满都是一等业务结果，不是错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// 准入通过，订单已排队等待持久化
    Accepted { order_id: i64 },
    /// 库存不足
    SoldOut,
    /// 该用户已下过单
    Duplicate,
    /// 订单队列已满，请稍后重试（背压点）
    QueueFull,
}

/// 秒杀下单管道
pub struct AdmissionPipeline {
    backend: Arc<dyn StoreBackend>,
    ids: IdGenerator,
    queue: mpsc::Sender<OrderTask>,
    consumer: JoinHandle<()>,
}

impl AdmissionPipeline {
    /// 启动管道，内部派生唯一的持久化消费者
    pub fn start(
        backend: Arc<dyn StoreBackend>,
        repository: Arc<dyn OrderRepository>,
        config: &SeckillConfig,
    ) -> Self {
        let (queue, rx) = mpsc::channel(config.queue_capacity);
        let lock_ttl = Duration::from_secs(config.order_lock_ttl_secs);
        let consumer = tokio::spawn(consume_orders(rx, backend.clone(), repository, lock_ttl));
        Self {
            backend: backend.clone(),
            ids: IdGenerator::new(backend),
            queue,
            consumer,
        }
    }

    /// 预置某个优惠券的秒杀库存，并清空其已下单用户集合
    pub async fn prepare_voucher(&self, voucher_id: u64, stock: i64) -> Result<()> {
        self.backend.del(&order_set_key(voucher_id)).await?;
        self.backend
            .set(&stock_key(voucher_id), stock.to_string().into_bytes())
            .await
    }

    /// 提交一次秒杀请求
    ///
    /// 准入检查在存储服务端原子执行，消除检查与扣减之间的竞态；
    /// 通过后订单ID立即返回，持久化异步完成。
    pub async fn submit(&self, voucher_id: u64, user_id: u64) -> Result<Submission> {
        match self.backend.seckill_admit(voucher_id, user_id).await? {
            1 => Ok(Submission::SoldOut),
            2 => Ok(Submission::Duplicate),
            0 => {
                let order_id = self.ids.next_id("order").await?;
                let task = OrderTask {
                    order_id,
                    user_id,
                    voucher_id,
                };
                match self.queue.try_send(task) {
                    Ok(()) => Ok(Submission::Accepted { order_id }),
                    Err(TrySendError::Full(task)) => {
                        // 准入已在存储侧记账，此处无补偿回滚，属已知缺口
                        error!(
                            order_id = task.order_id,
                            user_id = task.user_id,
                            "order queue full, declining submission"
                        );
                        Ok(Submission::QueueFull)
                    }
                    Err(TrySendError::Closed(_)) => {
                        Err(FlashError::Shutdown("order consumer stopped".to_string()))
                    }
                }
            }
            other => Err(FlashError::Backend(format!(
                "unexpected admission code: {}",
                other
            ))),
        }
    }

    /// 关闭管道：停止接收新任务并等待消费者清空队列
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            queue, consumer, ..
        } = self;
        drop(queue);
        consumer
            .await
            .map_err(|e| FlashError::Shutdown(e.to_string()))
    }
}

/// 唯一的持久化消费者：队列空时阻塞，永不与自身并发
async fn consume_orders(
    mut rx: mpsc::Receiver<OrderTask>,
    backend: Arc<dyn StoreBackend>,
    repository: Arc<dyn OrderRepository>,
    lock_ttl: Duration,
) {
    while let Some(task) = rx.recv().await {
        if let Err(e) = persist_order(&backend, repository.as_ref(), &task, lock_ttl).await {
            // 客户端已拿到订单ID，任务失败只记录不重试（至多一次语义）
            error!(order_id = task.order_id, "failed to persist order: {}", e);
        }
    }
    debug!("order queue closed, consumer exiting");
}

async fn persist_order(
    backend: &Arc<dyn StoreBackend>,
    repository: &dyn OrderRepository,
    task: &OrderTask,
    lock_ttl: Duration,
) -> Result<()> {
    let lock = KeyedMutex::new(backend.clone(), format!("order:{}", task.user_id));
    if !lock.acquire(lock_ttl).await? {
        warn!(
            order_id = task.order_id,
            user_id = task.user_id,
            "per-user order lock contended, dropping task"
        );
        return Ok(());
    }
    let result = create_order(repository, task).await;
    if let Err(e) = lock.release().await {
        warn!(user_id = task.user_id, "failed to release order lock: {}", e);
    }
    result
}

/// 落库前的兜底校验 + 条件扣减 + 插入
async fn create_order(repository: &dyn OrderRepository, task: &OrderTask) -> Result<()> {
    // 脚本级检查之外的纵深防御
    if repository.has_order(task.user_id, task.voucher_id).await? {
        warn!(
            user_id = task.user_id,
            voucher_id = task.voucher_id,
            "order already persisted for this user, dropping task"
        );
        return Ok(());
    }
    // 仅在 stock > 0 时扣减，非负性由存储保证
    if !repository.decrement_stock(task.voucher_id).await? {
        warn!(
            voucher_id = task.voucher_id,
            order_id = task.order_id,
            "authoritative stock exhausted, dropping task"
        );
        return Ok(());
    }
    repository.insert_order(task).await
}
