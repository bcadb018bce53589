//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 分布式互斥锁集成测试

#[path = "../common/mod.rs"]
mod common;

use common::setup_logging;
use oxflash::backend::MemoryBackend;
use oxflash::KeyedMutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[tokio::test]
async fn exactly_one_of_concurrent_acquirers_wins() {
    setup_logging();
    let backend = Arc::new(MemoryBackend::new());
    let barrier = Arc::new(Barrier::new(16));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let backend = backend.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            let lock = KeyedMutex::new(backend, "order:77");
            barrier.wait().await;
            lock.acquire(Duration::from_secs(10)).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn expired_lock_can_be_reacquired() {
    setup_logging();
    let backend = Arc::new(MemoryBackend::new());

    let crashed_holder = KeyedMutex::new(backend.clone(), "order:1");
    assert!(crashed_holder
        .acquire(Duration::from_millis(30))
        .await
        .unwrap());

    // TTL到期后锁自愈，新的持有者可以进入
    tokio::time::sleep(Duration::from_millis(60)).await;
    let next_holder = KeyedMutex::new(backend.clone(), "order:1");
    assert!(next_holder.acquire(Duration::from_secs(10)).await.unwrap());

    // 原持有者的释放对新锁是no-op
    assert!(!crashed_holder.release().await.unwrap());
    assert!(next_holder.release().await.unwrap());
}

#[tokio::test]
async fn release_makes_lock_available_again() {
    setup_logging();
    let backend = Arc::new(MemoryBackend::new());

    let first = KeyedMutex::new(backend.clone(), "rebuild:shop:5");
    let second = KeyedMutex::new(backend.clone(), "rebuild:shop:5");

    assert!(first.acquire(Duration::from_secs(10)).await.unwrap());
    assert!(!second.acquire(Duration::from_secs(10)).await.unwrap());

    assert!(first.release().await.unwrap());
    assert!(second.acquire(Duration::from_secs(10)).await.unwrap());
}
