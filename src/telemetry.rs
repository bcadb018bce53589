//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块提供日志订阅器的初始化辅助函数。

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// 初始化全局 tracing 订阅器
///
/// 应在应用程序启动时调用一次；重复调用是无害的。
/// 过滤级别取自 `RUST_LOG` 环境变量，缺省为 `info`。
/// 库代码本身只发射事件，由应用层决定订阅方式。
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .try_init()
            .ok();
    });
}
