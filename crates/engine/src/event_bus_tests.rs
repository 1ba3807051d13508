// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;

#[tokio::test]
async fn delivers_in_send_order() {
    let (bus, mut reader) = EventBus::new(8);
    bus.send(1).await.unwrap();
    bus.send(2).await.unwrap();
    bus.try_send(3).unwrap();

    assert_eq!(reader.recv().await, Some(1));
    assert_eq!(reader.recv().await, Some(2));
    assert_eq!(reader.recv().await, Some(3));
}

#[tokio::test]
async fn try_send_reports_full() {
    let (bus, _reader) = EventBus::new(1);
    bus.try_send("a").unwrap();
    assert_eq!(bus.try_send("b"), Err(BusError::Full));
}

#[tokio::test]
async fn close_is_idempotent_and_ends_the_stream() {
    let (bus, mut reader) = EventBus::new(4);
    bus.send("buffered").await.unwrap();

    assert!(bus.close());
    assert!(!bus.close());
    assert!(bus.is_closed());

    assert_eq!(bus.send("late").await, Err(BusError::Closed));
    assert_eq!(bus.try_send("late"), Err(BusError::Closed));
    assert_eq!(reader.recv().await, Some("buffered"));
    assert_eq!(reader.recv().await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn close_races_concurrent_senders() {
    let (bus, mut reader) = EventBus::new(1024);
    let bus = Arc::new(bus);

    let senders: Vec<_> = (0..8)
        .map(|n| {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move {
                for i in 0..100 {
                    if bus.send(n * 100 + i).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    let closers: Vec<_> = (0..4)
        .map(|_| {
            let bus = Arc::clone(&bus);
            tokio::spawn(async move { bus.close() })
        })
        .collect();

    let mut winners = 0;
    for closer in closers {
        if closer.await.unwrap() {
            winners += 1;
        }
    }
    for sender in senders {
        sender.await.unwrap();
    }
    assert_eq!(winners, 1);

    while reader.recv().await.is_some() {}
}
