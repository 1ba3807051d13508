// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repeat schedules for recurring tasks

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Each delay is used once, then the schedule is exhausted.
    Finite,
    /// Delays are cycled forever.
    Infinite,
}

/// Sequence of delays consumed one at a time by a repeated task.
#[derive(Debug, Clone)]
pub struct Scheduler {
    delays: Vec<Duration>,
    cursor: usize,
    mode: Mode,
}

impl Scheduler {
    /// Yield each delay once, in order.
    pub fn finite(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
            cursor: 0,
            mode: Mode::Finite,
        }
    }

    /// Cycle through the delays until the task is cancelled.
    pub fn infinite(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
            cursor: 0,
            mode: Mode::Infinite,
        }
    }

    /// Fire every `interval`, forever.
    pub fn every(interval: Duration) -> Self {
        Self::infinite([interval])
    }

    /// Fire `times` times, `interval` apart.
    pub fn times(interval: Duration, times: usize) -> Self {
        Self::finite(std::iter::repeat(interval).take(times))
    }

    /// Consume the next delay, or `None` once a finite schedule is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.delays.is_empty() {
            return None;
        }
        match self.mode {
            Mode::Finite => {
                let delay = self.delays.get(self.cursor).copied();
                if delay.is_some() {
                    self.cursor += 1;
                }
                delay
            }
            Mode::Infinite => {
                let delay = self.delays[self.cursor];
                self.cursor = (self.cursor + 1) % self.delays.len();
                Some(delay)
            }
        }
    }

    /// Delays left to consume; `-1` for an infinite schedule.
    pub fn rest_loop_count(&self) -> i64 {
        match self.mode {
            Mode::Finite => (self.delays.len() - self.cursor) as i64,
            Mode::Infinite if self.delays.is_empty() => 0,
            Mode::Infinite => -1,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.mode == Mode::Infinite && !self.delays.is_empty()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
