// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use tw_core::job;
use yare::parameterized;

const NOW: i64 = 1_000_000;

fn wheel(tick_ms: i64, slot_size: usize) -> (TimingWheel, Arc<DelayQueue<SlotKey>>) {
    let queue = Arc::new(DelayQueue::new());
    (TimingWheel::new(tick_ms, slot_size, NOW, Arc::clone(&queue)), queue)
}

fn task(id: &str, expired_ms: i64) -> Arc<Task> {
    Arc::new(Task::once(id, expired_ms, job(|| {})))
}

fn add(wheel: &mut TimingWheel, task: &Arc<Task>) -> Result<Placed, TimerError> {
    let mut displaced = Vec::new();
    let placed = wheel.add_task(task, NOW, &mut displaced);
    assert!(displaced.is_empty());
    placed
}

#[test]
fn levels_are_slot_size_times_coarser() {
    let (mut wheel, _queue) = wheel(1, 20);
    add(&mut wheel, &task("far", NOW + 5_000)).unwrap();

    assert_eq!(wheel.depth(), 3);
    let l1 = wheel.level_ref(1).unwrap();
    let l2 = wheel.level_ref(2).unwrap();
    assert_eq!(l1.tick_ms(), wheel.interval_ms());
    assert_eq!(l2.tick_ms(), l1.interval_ms());
    assert_eq!(l2.interval_ms(), 8_000);
}

#[parameterized(
    five_ms = { 5, 0 },
    last_base_tick = { 19, 0 },
    first_overflow = { 20, 1 },
    twenty_five_ms = { 25, 1 },
    second_overflow = { 400, 2 },
)]
fn routes_to_lowest_covering_level(delay_ms: i64, level: usize) {
    let (mut wheel, _queue) = wheel(1, 20);
    let t = task("t", NOW + delay_ms);

    let placed = add(&mut wheel, &t).unwrap();

    assert_eq!(placed.key.level, level);
    assert!(matches!(t.link(), SlotLink::Linked { level: l, .. } if l == level));
}

#[test]
fn deadline_within_one_tick_is_immediate() {
    let (mut wheel, queue) = wheel(10, 20);
    let t = task("soon", NOW + 9);

    assert_eq!(add(&mut wheel, &t), Err(TimerError::TaskIsExpired));
    assert_eq!(t.link(), SlotLink::Immediate);
    assert!(t.previous_slot().is_immediate());
    assert_eq!(wheel.task_count(), 0);
    assert!(queue.is_empty());
}

#[test]
fn cancelled_and_anonymous_tasks_are_rejected() {
    let (mut wheel, _queue) = wheel(1, 20);
    let cancelled = task("c", NOW + 5);
    cancelled.cancel();
    assert_eq!(
        add(&mut wheel, &cancelled),
        Err(TimerError::TaskCancelled("c".into()))
    );
    assert_eq!(add(&mut wheel, &task("", NOW + 5)), Err(TimerError::EmptyJobId));
}

#[test]
fn same_round_shares_one_registration() {
    let (mut wheel, queue) = wheel(1, 20);
    let a = task("a", NOW + 7);
    let b = task("b", NOW + 7);

    let first = add(&mut wheel, &a).unwrap();
    let second = add(&mut wheel, &b).unwrap();

    assert!(first.registered);
    assert!(!second.registered);
    assert_eq!(first.key, second.key);
    assert_eq!(queue.len(), 1);

    let slot = wheel.slot_mut(0, first.key.index).unwrap();
    let mut order = Vec::new();
    slot.flush(|t| order.push(t.id().to_string()));
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn overflow_bucket_covers_a_whole_coarse_tick() {
    let (mut wheel, queue) = wheel(1, 20);
    let a = task("a", NOW + 41);
    let b = task("b", NOW + 55);

    let pa = add(&mut wheel, &a).unwrap();
    let pb = add(&mut wheel, &b).unwrap();

    assert_eq!(pa.key, pb.key, "both fall in the same 20ms bucket");
    assert_eq!(pa.key.expiration_ms, NOW + 40);
    assert_eq!(queue.peek_expiration(), Some(NOW + 40));
}

#[test]
fn older_round_is_displaced_when_cell_is_reused() {
    let (mut wheel, queue) = wheel(1, 20);
    let old = task("old", NOW + 3);
    add(&mut wheel, &old).unwrap();

    // Twenty ticks later the same cell serves the next round.
    let later_now = NOW + 20;
    wheel.advance_clock(later_now);
    let new = task("new", later_now + 3);
    let mut displaced = Vec::new();
    let placed = wheel.add_task(&new, later_now, &mut displaced).unwrap();

    assert!(placed.registered);
    assert_eq!(displaced.len(), 1);
    assert_eq!(displaced[0].id(), "old");
    assert_eq!(old.link(), SlotLink::Detached);
    assert_eq!(queue.len(), 2, "stale registration stays until polled");
    assert_eq!(wheel.slot(0, placed.key.index).unwrap().len(), 1);
}

#[test]
fn advance_clock_truncates_and_propagates() {
    let (mut wheel, _queue) = wheel(1, 20);
    add(&mut wheel, &task("far", NOW + 1_000)).unwrap();

    wheel.advance_clock(NOW + 47);

    assert_eq!(wheel.current_time_ms(), NOW + 47);
    assert_eq!(wheel.level_ref(1).unwrap().current_time_ms(), NOW + 40);
    assert_eq!(wheel.level_ref(2).unwrap().current_time_ms(), NOW);
}

#[test]
fn advance_clock_ignores_sub_tick_and_backwards_moves() {
    let (mut wheel, _queue) = wheel(10, 20);
    wheel.advance_clock(NOW + 9);
    assert_eq!(wheel.current_time_ms(), NOW);

    wheel.advance_clock(NOW + 30);
    wheel.advance_clock(NOW + 10);
    assert_eq!(wheel.current_time_ms(), NOW + 30);
}

#[test]
fn remove_task_unlinks_through_the_task_link() {
    let (mut wheel, _queue) = wheel(1, 20);
    let t = task("t", NOW + 500);
    add(&mut wheel, &t).unwrap();

    assert!(wheel.remove_task(&t));
    assert!(!wheel.remove_task(&t));
    assert_eq!(wheel.task_count(), 0);
}

fn expected_level(tick_ms: i64, slot_size: i64, diff: i64) -> (usize, i64) {
    let mut level = 0;
    let mut tick = tick_ms;
    while diff >= tick * slot_size {
        tick *= slot_size;
        level += 1;
    }
    (level, tick)
}

proptest! {
    #[test]
    fn placed_at_expiration_over_tick_mod_slots(delay in 1i64..200_000, tick in 1i64..5, slots in 2usize..32) {
        let (mut wheel, _queue) = wheel(tick, slots);
        let expired = NOW + delay;
        let t = task("p", expired);
        let result = add(&mut wheel, &t);

        if delay < tick {
            prop_assert_eq!(result, Err(TimerError::TaskIsExpired));
        } else {
            let (level, tick_l) = expected_level(tick, slots as i64, delay);
            let placed = result.unwrap();
            prop_assert_eq!(placed.key.level, level);
            prop_assert_eq!(placed.key.index, ((expired / tick_l) % slots as i64) as usize);
        }
    }

    #[test]
    fn clock_never_moves_backwards(steps in proptest::collection::vec(0i64..5_000, 1..40)) {
        let (mut wheel, _queue) = wheel(1, 8);
        add(&mut wheel, &task("far", NOW + 100_000)).unwrap();
        let mut seen = vec![0i64; wheel.depth()];
        for step in steps {
            wheel.advance_clock(NOW + step);
            for (level, last) in seen.iter_mut().enumerate() {
                let current = wheel.level_ref(level).unwrap().current_time_ms();
                prop_assert!(current >= *last);
                *last = current;
            }
        }
    }
}
