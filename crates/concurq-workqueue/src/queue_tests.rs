use super::*;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

fn task(name: &str, priority: i32) -> Task {
    Task::new(name, priority, format!("Data for {}", name))
}

#[tokio::test]
async fn test_queue_put_take() {
    let queue = TaskQueue::new(4);
    let task = task("test", 5);
    let id = task.id();

    queue.put(task).await.unwrap();
    assert_eq!(queue.len(), 1);

    let taken = queue.take().await.unwrap();
    assert_eq!(taken.id(), id);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_priority_ordering() {
    let queue = TaskQueue::new(10);

    queue.put(task("routine", 7)).await.unwrap();
    queue.put(task("urgent", 1)).await.unwrap();
    queue.put(task("mixed", 4)).await.unwrap();

    assert_eq!(queue.take().await.unwrap().name(), "urgent");
    assert_eq!(queue.take().await.unwrap().name(), "mixed");
    assert_eq!(queue.take().await.unwrap().name(), "routine");
}

#[tokio::test]
async fn test_same_priority_ordered_by_creation_time() {
    let queue = TaskQueue::new(10);
    let now = Utc::now();
    let older = Task::from_parts(Uuid::new_v4(), "older", 3, now, "");
    let newer = Task::from_parts(Uuid::new_v4(), "newer", 3, now + chrono::Duration::seconds(1), "");

    queue.put(newer).await.unwrap();
    queue.put(older).await.unwrap();

    assert_eq!(queue.take().await.unwrap().name(), "older");
    assert_eq!(queue.take().await.unwrap().name(), "newer");
}

#[tokio::test]
async fn test_identical_timestamps_keep_insertion_order() {
    let queue = TaskQueue::new(10);
    let now = Utc::now();
    for name in ["first", "second", "third"] {
        queue
            .put(Task::from_parts(Uuid::new_v4(), name, 2, now, ""))
            .await
            .unwrap();
    }

    assert_eq!(queue.take().await.unwrap().name(), "first");
    assert_eq!(queue.take().await.unwrap().name(), "second");
    assert_eq!(queue.take().await.unwrap().name(), "third");
}

#[tokio::test]
async fn test_identical_payloads_not_deduplicated() {
    let queue = TaskQueue::new(10);
    queue.put(task("same", 1)).await.unwrap();
    queue.put(task("same", 1)).await.unwrap();
    assert_eq!(queue.len(), 2);
}

#[tokio::test]
async fn test_put_below_capacity_without_consumers() {
    let queue = TaskQueue::new(2);
    queue.put(task("only", 5)).await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.capacity(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_put_blocks_while_full() {
    let queue = Arc::new(TaskQueue::new(2));
    queue.put(task("1", 5)).await.unwrap();
    queue.put(task("2", 5)).await.unwrap();

    let blocked = tokio::time::timeout(Duration::from_millis(100), queue.put(task("3", 5))).await;
    assert!(blocked.is_err());
    // The abandoned put left nothing behind
    assert_eq!(queue.len(), 2);

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.put(task("4", 5)).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!producer.is_finished());

    queue.take().await.unwrap();
    producer.await.unwrap().unwrap();
    assert_eq!(queue.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_take_blocks_while_empty() {
    let queue = Arc::new(TaskQueue::new(2));

    let idle = tokio::time::timeout(Duration::from_millis(100), queue.take()).await;
    assert!(idle.is_err());

    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.take().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    queue.put(task("late", 3)).await.unwrap();

    let taken = consumer.await.unwrap().unwrap();
    assert_eq!(taken.name(), "late");
}

#[tokio::test]
async fn test_requeue_bypasses_capacity() {
    let queue = TaskQueue::new(1);
    queue.put(task("resident", 5)).await.unwrap();

    queue.requeue(task("retry", 2));
    assert_eq!(queue.len(), 2);

    // The retry never held a slot, so taking it does not free capacity
    assert_eq!(queue.take().await.unwrap().name(), "retry");
    let full = tokio::time::timeout(Duration::from_millis(20), queue.put(task("x", 5))).await;
    assert!(full.is_err());

    assert_eq!(queue.take().await.unwrap().name(), "resident");
    queue.put(task("x", 5)).await.unwrap();
}

#[tokio::test]
async fn test_drain_in_dispatch_order() {
    let queue = TaskQueue::new(5);
    queue.put(task("c", 9)).await.unwrap();
    queue.put(task("a", 1)).await.unwrap();
    queue.put(task("b", 4)).await.unwrap();

    let names: Vec<String> = queue.drain().iter().map(|t| t.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(queue.is_empty());

    // Drained slots are free again
    for i in 0..5 {
        queue.put(task(&i.to_string(), 5)).await.unwrap();
    }
    assert_eq!(queue.clear(), 5);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_close_rejects_put_and_take() {
    let queue = TaskQueue::new(2);
    queue.put(task("left", 5)).await.unwrap();
    queue.close();

    assert!(queue.is_closed());
    assert!(matches!(queue.put(task("late", 5)).await, Err(DispatchError::QueueClosed)));
    assert!(matches!(queue.take().await, Err(DispatchError::QueueClosed)));

    let drained = queue.drain();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].name(), "left");
}

#[tokio::test]
async fn test_close_wakes_blocked_consumer() {
    let queue = Arc::new(TaskQueue::new(2));
    let consumer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.take().await })
    };
    tokio::task::yield_now().await;

    queue.close();
    let result = consumer.await.unwrap();
    assert!(matches!(result, Err(DispatchError::QueueClosed)));
}
