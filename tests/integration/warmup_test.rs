//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 热键预热集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{memory_cache_store, setup_logging, Shop};
use oxflash::config::CacheConfig;
use oxflash::error::FlashError;
use oxflash::warmup::{warm_logical, WarmupReport};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn warmed_keys_serve_without_loader() {
    setup_logging();
    let (_backend, store) = memory_cache_store(CacheConfig::default());

    let ids: Vec<String> = (1..=3).map(|i| i.to_string()).collect();
    let report = warm_logical(
        &store,
        "shop",
        ids.clone(),
        Duration::from_secs(600),
        |id| async move { Ok(Some(Shop::sample(id.parse().unwrap()))) },
    )
    .await;
    assert_eq!(
        report,
        WarmupReport {
            loaded: 3,
            failed: 0
        }
    );

    let loader_calls = Arc::new(AtomicUsize::new(0));
    for id in &ids {
        let calls = loader_calls.clone();
        let result: Option<Shop> = store
            .get_logical("shop", id, Duration::from_secs(600), move |_id| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(result, Some(Shop::sample(id.parse().unwrap())));
    }
    assert_eq!(loader_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn warmup_counts_failures_without_aborting() {
    setup_logging();
    let (_backend, store) = memory_cache_store(CacheConfig::default());

    let ids: Vec<String> = vec!["1".into(), "missing".into(), "broken".into(), "2".into()];
    let report = warm_logical(&store, "shop", ids, Duration::from_secs(600), |id| async move {
        match id.as_str() {
            "missing" => Ok(None),
            "broken" => Err(FlashError::Backend("database unreachable".to_string())),
            _ => Ok(Some(Shop::sample(id.parse().unwrap()))),
        }
    })
    .await;

    assert_eq!(
        report,
        WarmupReport {
            loaded: 2,
            failed: 2
        }
    );
}
