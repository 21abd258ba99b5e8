//! Queue behaviour tests

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use super::*;
use crate::app::models::Task;
use crate::errors::QueueError;

#[tokio::test]
async fn test_fifo_order() {
    let (sender, receiver) = task_queue(8);
    for name in ["a", "b", "c"] {
        sender.send(Task::directory(name)).await.unwrap();
    }
    sender.close();

    let mut seen = Vec::new();
    while let Some(task) = receiver.recv().await {
        seen.push(task.path().to_string());
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_close_drains_remaining_items() {
    let (sender, receiver) = task_queue(4);
    sender.send(Task::file("x")).await.unwrap();
    sender.send(Task::file("y")).await.unwrap();
    sender.close();

    assert!(receiver.recv().await.is_some());
    assert!(receiver.recv().await.is_some());
    assert!(receiver.recv().await.is_none());
    assert_eq!(receiver.counters().dequeued(), 2);
}

#[tokio::test]
async fn test_backpressure_blocks_producer() {
    let (sender, receiver) = task_queue(2);
    sender.send(Task::file("1")).await.unwrap();
    sender.send(Task::file("2")).await.unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(50), sender.send(Task::file("3")));
    assert!(blocked.await.is_err(), "third send should wait for a free slot");

    receiver.recv().await.unwrap();
    tokio::time::timeout(Duration::from_millis(500), sender.send(Task::file("3")))
        .await
        .expect("slot freed")
        .unwrap();
    assert_eq!(sender.capacity(), 2);
}

#[tokio::test]
async fn test_send_after_receivers_dropped() {
    let (sender, receiver) = task_queue(1);
    drop(receiver);
    assert!(matches!(
        sender.send(Task::file("x")).await,
        Err(QueueError::Closed)
    ));
}

#[tokio::test]
async fn test_blocking_send_from_blocking_thread() {
    let (sender, receiver) = task_queue(3);
    let producer = tokio::task::spawn_blocking(move || {
        for i in 0..10 {
            sender.blocking_send(Task::file(format!("f{}", i))).unwrap();
        }
    });

    let mut count = 0;
    while receiver.recv().await.is_some() {
        count += 1;
    }
    producer.await.unwrap();
    assert_eq!(count, 10);
}

#[tokio::test]
async fn test_concurrent_consumers_take_each_task_once() {
    let (sender, receiver) = task_queue(4);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let receiver = receiver.clone();
        let seen = Arc::clone(&seen);
        handles.push(tokio::spawn(async move {
            while let Some(task) = receiver.recv().await {
                seen.lock().await.push(task.path().to_string());
                tokio::task::yield_now().await;
            }
        }));
    }
    drop(receiver);

    for i in 0..100 {
        sender.send(Task::file(format!("f{}", i))).await.unwrap();
    }
    let counters_enqueued = sender.counters().enqueued();
    sender.close();

    for handle in handles {
        handle.await.unwrap();
    }

    let seen = seen.lock().await;
    let unique: HashSet<_> = seen.iter().collect();
    assert_eq!(seen.len(), 100);
    assert_eq!(unique.len(), 100);
    assert_eq!(counters_enqueued, 100);
}
