// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tw_core::job;

fn task(id: &str) -> Arc<Task> {
    Arc::new(Task::once(id, 100, job(|| {})))
}

fn flush_ids(slot: &mut Slot) -> Vec<String> {
    let mut ids = Vec::new();
    slot.flush(|t| ids.push(t.id().to_string()));
    ids
}

#[test]
fn new_slot_is_unset_and_empty() {
    let slot = Slot::new(3, 1);
    assert_eq!(slot.id(), 3);
    assert_eq!(slot.level(), 1);
    assert_eq!(slot.expiration_ms(), EXPIRATION_UNSET);
    assert!(slot.is_empty());
}

#[test]
fn set_expiration_reports_round_changes() {
    let mut slot = Slot::new(0, 0);
    assert!(slot.set_expiration(40));
    assert!(!slot.set_expiration(40), "same round is not a change");
    assert!(slot.set_expiration(60));

    slot.reset();
    assert_eq!(slot.expiration_ms(), EXPIRATION_UNSET);
}

#[test]
fn add_task_links_and_snapshots() {
    let mut slot = Slot::new(5, 2);
    slot.set_expiration(800);
    let t = task("a");

    assert!(slot.add_task(&t));

    assert_eq!(slot.len(), 1);
    assert!(matches!(
        t.link(),
        SlotLink::Linked { level: 2, index: 5, .. }
    ));
    assert_eq!(
        t.previous_slot(),
        SlotSnapshot {
            level: 2,
            expiration_ms: 800
        }
    );
}

#[test]
fn flush_drains_in_insertion_order_and_detaches() {
    let mut slot = Slot::new(0, 0);
    slot.set_expiration(10);
    let tasks: Vec<_> = ["a", "b", "c"].into_iter().map(task).collect();
    for t in &tasks {
        slot.add_task(t);
    }

    assert_eq!(flush_ids(&mut slot), vec!["a", "b", "c"]);

    assert!(slot.is_empty());
    assert!(slot.is_flushed());
    for t in &tasks {
        assert_eq!(t.link(), SlotLink::Detached);
        assert_eq!(t.previous_slot().expiration_ms, 10);
    }
}

#[test]
fn remove_task_unlinks_from_any_position() {
    let mut slot = Slot::new(0, 0);
    slot.set_expiration(10);
    let tasks: Vec<_> = ["a", "b", "c", "d"].into_iter().map(task).collect();
    for t in &tasks {
        slot.add_task(t);
    }

    assert!(slot.remove_task(&tasks[1]));
    assert!(slot.remove_task(&tasks[3]));
    assert!(!slot.remove_task(&tasks[3]), "second removal is a no-op");

    assert_eq!(tasks[1].link(), SlotLink::Detached);
    assert_eq!(slot.len(), 2);
    assert_eq!(flush_ids(&mut slot), vec!["a", "c"]);
}

#[test]
fn removed_nodes_are_reused() {
    let mut slot = Slot::new(0, 0);
    slot.set_expiration(10);
    let a = task("a");
    let b = task("b");
    slot.add_task(&a);
    slot.remove_task(&a);
    slot.add_task(&b);

    assert!(matches!(b.link(), SlotLink::Linked { node: 0, .. }));
    assert_eq!(flush_ids(&mut slot), vec!["b"]);
}

#[test]
fn remove_ignores_tasks_linked_elsewhere() {
    let mut here = Slot::new(0, 0);
    let mut there = Slot::new(1, 0);
    here.set_expiration(10);
    there.set_expiration(11);
    let a = task("a");
    let b = task("b");
    here.add_task(&a);
    there.add_task(&b);

    assert!(!here.remove_task(&b));
    assert_eq!(here.len(), 1);
    assert_eq!(there.len(), 1);
}

#[test]
fn flushed_slot_ignores_add_and_remove_until_reassigned() {
    let mut slot = Slot::new(0, 0);
    slot.set_expiration(10);
    let a = task("a");
    slot.add_task(&a);
    let mut drained = Vec::new();
    slot.flush(|t| drained.push(t));

    let late = task("late");
    assert!(!slot.add_task(&late));
    assert!(!slot.remove_task(&a));
    assert_eq!(late.link(), SlotLink::Detached);

    slot.reset();
    assert!(slot.set_expiration(30));
    assert!(slot.add_task(&late));
    assert_eq!(slot.len(), 1);
}
