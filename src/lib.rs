//! oxflash - Redis 后端并发工具箱
//!
//! 提供旁路缓存（穿透/击穿/雪崩防护）、分布式互斥锁、单调递增ID生成器，
//! 以及带异步持久化的秒杀下单管道。
//!
//! HTTP 路由、会话鉴权和 ORM 映射不属于本库，通过 trait 作为外部协作方接入。

#![doc(html_root_url = "https://docs.rs/oxflash/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod id;
pub mod lock;
pub mod seckill;
pub mod serialization;
pub mod telemetry;
pub mod warmup;

// Re-export commonly used items
pub use backend::StoreBackend;
pub use cache::CacheStore;
pub use config::Config;
pub use error::{FlashError, Result};
pub use id::IdGenerator;
pub use lock::KeyedMutex;
pub use seckill::{AdmissionPipeline, Submission};

/// oxflash 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
