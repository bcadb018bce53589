//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! ID生成器集成测试

#[path = "../common/mod.rs"]
mod common;

use common::setup_logging;
use oxflash::backend::MemoryBackend;
use oxflash::IdGenerator;
use std::collections::HashSet;
use std::sync::Arc;

#[tokio::test]
async fn sequential_ids_strictly_increase() {
    setup_logging();
    let generator = IdGenerator::new(Arc::new(MemoryBackend::new()));
    let mut previous = 0;
    for _ in 0..200 {
        let id = generator.next_id("order").await.unwrap();
        assert!(id > previous, "id {} not greater than {}", id, previous);
        previous = id;
    }
}

#[tokio::test]
async fn concurrent_ids_are_unique() {
    setup_logging();
    let generator = Arc::new(IdGenerator::new(Arc::new(MemoryBackend::new())));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let generator = generator.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::with_capacity(50);
            for _ in 0..50 {
                ids.push(generator.next_id("order").await.unwrap());
            }
            ids
        }));
    }

    let mut all = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(all.insert(id), "duplicate id generated: {}", id);
        }
    }
    assert_eq!(all.len(), 400);
}

#[tokio::test]
async fn ids_are_positive_63_bit() {
    setup_logging();
    let generator = IdGenerator::new(Arc::new(MemoryBackend::new()));
    let id = generator.next_id("order").await.unwrap();
    assert!(id > 0);
}
