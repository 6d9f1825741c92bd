//! 并发执行单元之间的上下文隔离与释放保证。

use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use dbrouter_core::{
    DbRouter, DbRouterAspect, RouterConfig, RouterError, ShardCoordinate, current_shard_coordinate,
};

fn aspect() -> Arc<DbRouterAspect> {
    Arc::new(DbRouterAspect::with_hash_strategy(
        RouterConfig::new(4, 4, "userId").unwrap(),
    ))
}

fn keys() -> Vec<String> {
    (0..8).map(|i| format!("user-{i}")).collect()
}

#[test]
fn threads_never_observe_each_other() {
    let aspect = aspect();
    let keys = keys();
    let barrier = Arc::new(Barrier::new(keys.len()));

    let handles: Vec<_> = keys
        .into_iter()
        .map(|key| {
            let aspect = Arc::clone(&aspect);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let expected = aspect
                    .route(&DbRouter::default(), &[key.as_str().into()])
                    .unwrap();
                aspect
                    .around(&DbRouter::default(), &[key.as_str().into()], || {
                        barrier.wait();
                        for _ in 0..20 {
                            assert_eq!(current_shard_coordinate(), Some(expected));
                            thread::sleep(Duration::from_millis(1));
                        }
                        Ok::<(), RouterError>(())
                    })
                    .unwrap();
                assert_eq!(current_shard_coordinate(), None);
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tasks_keep_their_own_coordinate_across_awaits() {
    let aspect = aspect();
    let mut handles = Vec::new();
    for key in keys() {
        let aspect = Arc::clone(&aspect);
        handles.push(tokio::spawn(async move {
            let expected = aspect
                .route(&DbRouter::default(), &[key.as_str().into()])
                .unwrap();
            // 入参切片只在构造 Future 时借用，`.await` 之前即已释放，保证任务可 `Send`。
            let routed =
                aspect.around_async(&DbRouter::default(), &[key.as_str().into()], async move {
                    let mut seen = Vec::new();
                    for _ in 0..10 {
                        seen.push(current_shard_coordinate());
                        tokio::time::sleep(Duration::from_millis(1)).await;
                    }
                    Ok::<_, RouterError>(seen)
                });
            let seen = routed.await.unwrap();
            assert!(seen.iter().all(|coordinate| *coordinate == Some(expected)));
            assert_eq!(current_shard_coordinate(), None);
        }));
    }
    for handle in handles {
        handle.await.expect("routed task panicked");
    }
}

#[tokio::test]
async fn cancelled_operation_leaves_no_context() {
    let aspect = aspect();
    let slow = aspect.around_async(&DbRouter::default(), &["10000001".into()], async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<(), RouterError>(())
    });
    let outcome = tokio::time::timeout(Duration::from_millis(10), slow).await;
    assert!(outcome.is_err(), "operation should have timed out");
    assert_eq!(current_shard_coordinate(), None);
}

#[tokio::test]
async fn failed_operation_leaves_no_context() {
    let aspect = aspect();
    let result = aspect
        .around_async(&DbRouter::default(), &["10000001".into()], async {
            assert!(current_shard_coordinate().is_some());
            Err::<(), _>(RouterError::configuration("simulated driver failure"))
        })
        .await;
    assert!(result.is_err());
    assert_eq!(current_shard_coordinate(), None);
}

#[tokio::test]
async fn spawned_tasks_do_not_inherit_coordinate() {
    let aspect = aspect();
    let child_view = aspect
        .around_async(&DbRouter::default(), &["10000001".into()], async {
            let child = tokio::spawn(async { current_shard_coordinate() });
            let seen = child.await.expect("child task panicked");
            Ok::<Option<ShardCoordinate>, RouterError>(seen)
        })
        .await
        .unwrap();
    assert_eq!(child_view, None);
}
