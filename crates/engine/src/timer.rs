// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public timer handle.
//!
//! Starting a timer spawns two loops on the ambient tokio runtime:
//!
//! - the event worker, sole owner of the wheel, applying add/cancel events
//!   from callers and expired-slot events from the poller, and feeding due
//!   jobs that found the pool full back in as room frees up;
//! - the expiry poller, draining due slots out of the delay queue.
//!
//! Callers only touch the registry, atomic flags, and the event bus.

use crate::config::TimerConfig;
use crate::delay_queue::{DelayQueue, PollExit};
use crate::error::TimerError;
use crate::event::Event;
use crate::event_bus::{EventBus, EventReader};
use crate::pool::WorkerPool;
use crate::registry::Registry;
use crate::runtime::{Runtime, RuntimeDeps};
use crate::scheduler::Scheduler;
use crate::stats::{AtomicStats, NoopStats, Stats, StatsSnapshot};
use crate::task::Task;
use crate::wheel::SlotKey;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use tw_core::{job, Clock, IdGen, JobId, SnowflakeIdGen, SourceClock, SystemClock};

type NextId = Box<dyn Fn() -> u64 + Send + Sync>;

struct Inner<C: Clock> {
    name: String,
    tick_ms: u64,
    clock: C,
    next_id: NextId,
    bus: EventBus<Event>,
    registry: Registry,
    queue: Arc<DelayQueue<SlotKey>>,
    pool: Arc<WorkerPool>,
    stats: Arc<dyn Stats>,
    atomic_stats: Option<Arc<AtomicStats>>,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    handle: Handle,
}

impl<C: Clock> Inner<C> {
    fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.shutdown_tx.send_replace(true);
        self.bus.close();
        self.pool.release();
        self.registry.clear();
        info!(name = %self.name, "timer stopped");
        true
    }
}

impl<C: Clock> Drop for Inner<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to a running hierarchical timing-wheel timer.
///
/// Cheap to clone. The timer shuts down when [`Timer::shutdown`] is called or
/// the last handle is dropped.
pub struct Timer<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for Timer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Timer<SystemClock> {
    /// Start with the system clock and snowflake job ids.
    pub fn start(config: TimerConfig) -> Result<Self, TimerError> {
        TimerBuilder::new(config).start()
    }

    pub fn builder(config: TimerConfig) -> TimerBuilder<SystemClock> {
        TimerBuilder::new(config)
    }
}

impl Timer<SourceClock> {
    /// Start on the clock named by `config.clock`.
    pub fn from_config(config: TimerConfig) -> Result<Self, TimerError> {
        let clock = config.clock.clock();
        TimerBuilder::new(config).clock(clock).start()
    }
}

impl<C: Clock> Timer<C> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.inner.tick_ms)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Tasks scheduled and not yet finished or cancelled.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slot rounds waiting in the delay queue.
    pub fn pending_slots(&self) -> usize {
        self.inner.queue.len()
    }

    /// Counters and histograms, when built-in stats are enabled.
    pub fn stats(&self) -> Option<StatsSnapshot> {
        self.inner.atomic_stats.as_ref().map(|stats| stats.snapshot())
    }

    pub fn now_ms(&self) -> i64 {
        self.inner.clock.epoch_ms() as i64
    }

    fn ensure_running(&self) -> Result<(), TimerError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(TimerError::Stopped)
        }
    }

    /// Schedule a caller-built task.
    pub async fn add_task(&self, task: Task) -> Result<JobId, TimerError> {
        self.ensure_running()?;
        if task.id().is_empty() {
            return Err(TimerError::EmptyJobId);
        }
        if task.is_cancelled() {
            return Err(TimerError::TaskCancelled(task.id().clone()));
        }

        let task = Arc::new(task);
        let id = task.id().clone();
        self.inner.registry.insert(Arc::clone(&task))?;

        if self.inner.bus.send(Event::Add(Arc::clone(&task))).await.is_err() {
            self.inner.registry.remove_if_same(&task);
            return Err(TimerError::Stopped);
        }
        self.inner.stats.job_added();
        Ok(id)
    }

    /// Run `f` once, `delay` from now.
    pub async fn after_func(
        &self,
        delay: Duration,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Result<JobId, TimerError> {
        self.ensure_running()?;
        let delay_ms = delay.as_millis() as u64;
        if delay_ms < self.inner.tick_ms {
            return Err(TimerError::TaskTooShortExpiration {
                delay_ms,
                tick_ms: self.inner.tick_ms,
            });
        }

        let id = JobId::from((self.inner.next_id)());
        let expired_ms = self.now_ms().saturating_add(delay_ms as i64);
        self.add_task(Task::once(id, expired_ms, job(f))).await
    }

    /// Run `f` repeatedly on the delays yielded by the scheduler `factory`
    /// builds. The first run is one delay from now.
    pub async fn schedule_func(
        &self,
        factory: impl FnOnce() -> Scheduler,
        f: impl Fn() + Send + Sync + 'static,
    ) -> Result<JobId, TimerError> {
        self.ensure_running()?;
        let mut scheduler = factory();
        let first = scheduler.next_delay().ok_or(TimerError::UnknownScheduler)?;

        let id = JobId::from((self.inner.next_id)());
        let expired_ms = self.now_ms().saturating_add(first.as_millis() as i64);
        self.add_task(Task::repeated(id, expired_ms, job(f), scheduler))
            .await
    }

    /// Cancel a scheduled task. A task already cancelled is left alone.
    pub async fn cancel_task(&self, id: &JobId) -> Result<(), TimerError> {
        if id.is_empty() {
            return Err(TimerError::EmptyJobId);
        }
        self.ensure_running()?;
        let task = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| TimerError::TaskNotFound(id.clone()))?;

        if !task.cancel() {
            return Ok(());
        }
        self.inner
            .bus
            .send(Event::Cancel(task))
            .await
            .map_err(|_| TimerError::Stopped)
    }

    /// Stop the timer. Returns `true` only for the call that stopped it.
    pub fn shutdown(&self) -> bool {
        self.inner.stop()
    }

    /// Shut down when `signal` resolves (e.g. `tokio::signal::ctrl_c()`).
    ///
    /// The watcher holds no strong reference, so it never keeps the timer
    /// alive on its own.
    pub fn shutdown_on<F>(&self, signal: F) -> JoinHandle<()>
    where
        F: Future + Send + 'static,
    {
        let inner: Weak<Inner<C>> = Arc::downgrade(&self.inner);
        self.inner.handle.spawn(async move {
            signal.await;
            if let Some(inner) = inner.upgrade() {
                inner.stop();
            }
        })
    }
}

/// Injects collaborators before a timer starts.
pub struct TimerBuilder<C: Clock = SystemClock> {
    config: TimerConfig,
    clock: C,
    next_id: Option<NextId>,
    stats: Option<Arc<dyn Stats>>,
}

impl TimerBuilder<SystemClock> {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            clock: SystemClock,
            next_id: None,
            stats: None,
        }
    }
}

impl<C: Clock> TimerBuilder<C> {
    pub fn clock<D: Clock>(self, clock: D) -> TimerBuilder<D> {
        TimerBuilder {
            config: self.config,
            clock,
            next_id: self.next_id,
            stats: self.stats,
        }
    }

    /// Source of auto-assigned job ids. Defaults to a snowflake generator.
    pub fn id_gen(mut self, id_gen: impl IdGen) -> Self {
        self.next_id = Some(Box::new(move || id_gen.next()));
        self
    }

    /// Send stats to `stats` instead of the built-in sink.
    pub fn stats_sink(mut self, stats: Arc<dyn Stats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn start(self) -> Result<Timer<C>, TimerError> {
        let handle = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        let config = self.config.validated();

        let (stats, atomic_stats): (Arc<dyn Stats>, Option<Arc<AtomicStats>>) =
            match (self.stats, config.stats) {
                (Some(sink), _) => (sink, None),
                (None, true) => {
                    let atomic = Arc::new(AtomicStats::new());
                    (Arc::clone(&atomic) as Arc<dyn Stats>, Some(atomic))
                }
                (None, false) => (Arc::new(NoopStats), None),
            };

        let next_id = match self.next_id {
            Some(next_id) => next_id,
            None => {
                let snowflake = SnowflakeIdGen::with_clock(0, self.clock.clone());
                Box::new(move || snowflake.next())
            }
        };

        let queue = Arc::new(DelayQueue::with_capacity(config.slot_buffer));
        let registry = Registry::default();
        let pool = Arc::new(WorkerPool::spawn(
            &handle,
            config.worker_pool_size,
            config.worker_queue_size,
        ));
        let (bus, reader) = EventBus::new(config.event_buffer);
        let (expired_tx, expired_rx) = mpsc::channel(config.slot_buffer);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runtime = Runtime::new(
            &config,
            self.clock.clone(),
            RuntimeDeps {
                queue: Arc::clone(&queue),
                registry: registry.clone(),
                pool: Arc::clone(&pool),
                stats: Arc::clone(&stats),
            },
        );

        handle.spawn(
            event_worker(runtime, reader, expired_rx, shutdown_rx.clone())
                .instrument(info_span!("timer.events", name = %config.name)),
        );
        handle.spawn(
            expiry_poller(Arc::clone(&queue), self.clock.clone(), expired_tx, shutdown_rx)
                .instrument(info_span!("timer.poller", name = %config.name)),
        );

        info!(
            name = %config.name,
            tick_ms = config.tick_ms,
            slot_size = config.slot_size,
            workers = config.worker_pool_size,
            "timer started"
        );

        Ok(Timer {
            inner: Arc::new(Inner {
                name: config.name,
                tick_ms: config.tick_ms,
                clock: self.clock,
                next_id,
                bus,
                registry,
                queue,
                pool,
                stats,
                atomic_stats,
                running: AtomicBool::new(true),
                shutdown_tx,
                handle,
            }),
        })
    }
}

async fn event_worker<C: Clock>(
    mut runtime: Runtime<C>,
    mut events: EventReader<Event>,
    mut expired: mpsc::Receiver<SlotKey>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        // Owned so the wait for pool room does not borrow the runtime.
        let pool = Arc::clone(&runtime.pool);
        let event = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            slot = pool.reserve(), if runtime.has_backlog() => {
                match slot {
                    Ok(slot) => runtime.drain_backlog(slot),
                    Err(e) => runtime.abandon_backlog(e),
                }
                continue;
            }
            Some(key) = expired.recv() => Event::Expired(key),
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };
        runtime.process(event);
    }
    info!("event worker stopped");
}

/// Run the delay-queue poller, restarting it if it panics.
async fn expiry_poller<C: Clock>(
    queue: Arc<DelayQueue<SlotKey>>,
    clock: C,
    sink: mpsc::Sender<SlotKey>,
    shutdown: watch::Receiver<bool>,
) {
    loop {
        let poll = {
            let queue = Arc::clone(&queue);
            let clock = clock.clone();
            let sink = sink.clone();
            let mut shutdown = shutdown.clone();
            tokio::spawn(async move { queue.poll_to_chan(&clock, &sink, &mut shutdown).await })
        };
        match poll.await {
            Ok(PollExit::Shutdown) | Ok(PollExit::SinkClosed) => break,
            Err(e) if e.is_panic() => {
                error!("expiry poller panicked, restarting");
            }
            Err(_) => break,
        }
    }
    info!("expiry poller stopped");
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
