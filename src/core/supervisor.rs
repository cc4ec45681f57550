//! # Supervisor: owns the generation loop, reloads and cooperative shutdown.
//!
//! ## High-level architecture
//! ```text
//! run(slot, shutdown)
//!   ├─► active = true
//!   ├─► spawn generation_loop(run_token = shutdown.child_token())
//!   └─► await shutdown ─► active = false ─► wait loop (≤ grace) ─► release slot
//!
//! generation_loop:
//!   while active && !run_token.cancelled:
//!     ├─► GenerationBuilder::build(id) ──Err──► GenerationFailed, loop ends (no retry)
//!     ├─► cancel = run_token.child_token(), group = JoinGroup::new()
//!     ├─► spawn reload monitor: select { reload.notified() → cancel.cancel(), cancel.cancelled() }
//!     ├─► spawn every worker: worker.run(group.slot(), cancel.clone())
//!     ├─► group.wait()                      (all workers released their slot)
//!     └─► cancel.cancel(), join monitor, GenerationStopped
//! ```
//!
//! ## Rules
//! - Generations never overlap: the next build starts only after the join group drained.
//! - A generation's token is closed by a reload, by shutdown (parent token), or after
//!   its workers all exited on their own. Closing is idempotent.
//! - A failed build stops the loop for this `run`; `run` itself keeps waiting for shutdown.
//! - `reload` is non-blocking and coalescing: at most one notification is pending.
//!   A notification sent while no generation listens is consumed by the next one.
//! - Workers get no timeout. Only shutdown is bounded, by [`SupervisorConfig::grace`].
//! - A generation loop left behind by an exceeded grace keeps the supervisor busy:
//!   `run` refuses to start another one until it has exited.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::{Notify, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::builder::SupervisorBuilder;
use crate::core::generation::{Generation, GenerationBuilder};
use crate::core::{JoinGroup, JoinSlot, SupervisorConfig};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;
use crate::workers::{ConsumerFactory, EndpointSource, SinkFactory};

/// Worker-generation supervisor.
///
/// Build it with [`Supervisor::builder`], start it with [`Supervisor::run`],
/// restart its worker set with [`Supervisor::reload`].
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    builder: GenerationBuilder,
    reload: Notify,
    active: AtomicBool,
    /// Set while a generation loop task exists, cleared when it returns.
    looping: AtomicBool,
    generation: AtomicU64,
    /// Stops the subscriber listener on [`close`](Supervisor::close) or drop.
    lifetime: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Clears the `looping` flag when the generation loop ends, panics included.
struct LoopGuard<'a>(&'a AtomicBool);

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Supervisor {
    /// Starts building a supervisor from its injected collaborators.
    pub fn builder(
        cfg: SupervisorConfig,
        endpoints: Arc<dyn EndpointSource>,
        sinks: Arc<dyn SinkFactory>,
        consumers: Arc<dyn ConsumerFactory>,
    ) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, endpoints, sinks, consumers)
    }

    pub(crate) fn new_internal(cfg: SupervisorConfig, bus: Bus, builder: GenerationBuilder) -> Self {
        Self {
            cfg,
            bus,
            builder,
            reload: Notify::new(),
            active: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            lifetime: CancellationToken::new(),
            listener: Mutex::new(None),
        }
    }

    /// Forwards bus events to the subscriber set until the supervisor is closed or dropped.
    pub(crate) fn subscriber_listener(&self, set: SubscriberSet) {
        let mut rx = self.bus.subscribe();
        let lifetime = self.lifetime.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = lifetime.cancelled() => {
                        loop {
                            match rx.try_recv() {
                                Ok(ev) => set.emit(ev),
                                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                                Err(_) => break,
                            }
                        }
                        break;
                    }
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber listener lagged behind the event bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            set.shutdown().await;
        });
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stops event delivery: forwards what is already on the bus, then waits
    /// until every subscriber has processed its queue.
    ///
    /// Events published afterwards are still visible to [`subscribe`](Self::subscribe)
    /// receivers but no longer reach subscribers.
    pub async fn close(&self) {
        self.lifetime.cancel();
        let handle = self.listener.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Runs the supervisor until `shutdown` fires.
    ///
    /// `slot` is the host's join handle for this unit; it is released exactly once,
    /// when this future completes. Calling `run` on a supervisor that is already
    /// running is a misuse: it logs a warning and returns at once. The same
    /// happens while the generation loop of a previous `run` has not exited yet
    /// (its shutdown exceeded the grace period).
    pub async fn run(self: Arc<Self>, slot: JoinSlot, shutdown: CancellationToken) {
        let _slot = slot;
        if self.active.swap(true, Ordering::AcqRel) {
            warn!("supervisor is already running");
            return;
        }
        if self.looping.swap(true, Ordering::AcqRel) {
            self.active.store(false, Ordering::Release);
            warn!(
                generation = self.generation(),
                "previous generation is still draining, refusing to run"
            );
            return;
        }

        let run_token = shutdown.child_token();
        let mut generations = tokio::spawn(Arc::clone(&self).generation_loop(run_token.clone()));

        shutdown.cancelled().await;
        self.active.store(false, Ordering::Release);
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        run_token.cancel();

        let grace = self.cfg.grace;
        match tokio::time::timeout(grace, &mut generations).await {
            Ok(_) => {
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            }
            Err(_elapsed) => {
                let generation = self.generation();
                let err = RuntimeError::GraceExceeded { grace, generation };
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_generation(generation)
                        .with_reason(err.to_string()),
                );
            }
        }
        self.bus.publish(Event::new(EventKind::SupervisorStopped));
    }

    /// Requests a restart of the current worker set. Never blocks.
    ///
    /// Several calls before the next generation picks the notification up collapse
    /// into one reload.
    pub fn reload(&self) {
        self.bus.publish(Event::new(EventKind::ReloadRequested));
        self.reload.notify_one();
    }

    /// `true` between the start of [`run`](Self::run) and its shutdown.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Id of the most recently started generation (`0` before the first).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Subscribes to runtime events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    async fn generation_loop(self: Arc<Self>, run_token: CancellationToken) {
        let _looping = LoopGuard(&self.looping);
        while self.is_active() && !run_token.is_cancelled() {
            let id = self.generation() + 1;
            let generation = match self.builder.build(id).await {
                Ok(generation) => generation,
                Err(err) => {
                    self.bus.publish(
                        Event::new(EventKind::GenerationFailed)
                            .with_generation(id)
                            .with_reason(err.to_string()),
                    );
                    return;
                }
            };
            if run_token.is_cancelled() {
                break;
            }

            self.generation.store(id, Ordering::Release);
            self.run_generation(generation, run_token.child_token())
                .await;
        }
    }

    /// Launches every worker of `generation` and waits until all of them released their slot.
    async fn run_generation(self: &Arc<Self>, generation: Generation, cancel: CancellationToken) {
        let id = generation.id();
        let group = JoinGroup::new();

        self.bus.publish(
            Event::new(EventKind::GenerationStarted)
                .with_generation(id)
                .with_workers(generation.len()),
        );

        let monitor = {
            let me = Arc::clone(self);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = me.reload.notified() => {
                        me.bus.publish(Event::new(EventKind::ReloadApplied).with_generation(id));
                        cancel.cancel();
                    }
                }
            })
        };

        for worker in generation.into_workers() {
            let slot = group.slot();
            // Held by the wrapper so `WorkerStopped` precedes `GenerationStopped`.
            let reporting = group.slot();
            let cancel = cancel.clone();
            let bus = self.bus.clone();

            tokio::spawn(async move {
                let name = worker.name().to_string();
                bus.publish(
                    Event::new(EventKind::WorkerStarting)
                        .with_generation(id)
                        .with_worker(name.as_str()),
                );

                let run = std::panic::AssertUnwindSafe(worker.run(slot, cancel));
                let panicked = run.catch_unwind().await.is_err();

                let mut stopped = Event::new(EventKind::WorkerStopped)
                    .with_generation(id)
                    .with_worker(name);
                if panicked {
                    stopped = stopped.with_reason("worker panicked");
                }
                bus.publish(stopped);
                reporting.release();
            });
        }

        group.wait().await;
        cancel.cancel();
        let _ = monitor.await;

        self.bus
            .publish(Event::new(EventKind::GenerationStopped).with_generation(id));
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::{FakeConsumers, FakeSinks, Probe};
    use crate::subscribers::Subscribe;
    use crate::workers::StaticEndpoints;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        sup: Arc<Supervisor>,
        rx: broadcast::Receiver<Event>,
        group: JoinGroup,
        shutdown: CancellationToken,
    }

    impl Harness {
        fn start(cfg: SupervisorConfig, endpoints: Arc<StaticEndpoints>, consumers: Arc<FakeConsumers>) -> Self {
            let sup = Supervisor::builder(cfg, endpoints, Arc::new(FakeSinks::ok()), consumers).build();
            let rx = sup.subscribe();
            let group = JoinGroup::new();
            let shutdown = CancellationToken::new();
            tokio::spawn(Arc::clone(&sup).run(group.slot(), shutdown.clone()));
            Self {
                sup,
                rx,
                group,
                shutdown,
            }
        }

        /// Waits for the next event of `kind`, skipping others.
        async fn next(&mut self, kind: EventKind) -> Event {
            tokio::time::timeout(WAIT, async {
                loop {
                    match self.rx.recv().await {
                        Ok(ev) if ev.kind == kind => return ev,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
                    }
                }
            })
            .await
            .unwrap_or_else(|_| panic!("no {kind:?} event"))
        }

        async fn stop(&self) {
            self.shutdown.cancel();
            tokio::time::timeout(WAIT, self.group.wait())
                .await
                .expect("run releases its slot after shutdown");
        }
    }

    async fn until(cond: impl Fn() -> bool) {
        tokio::time::timeout(WAIT, async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_generation_launches_consumers_plus_sink() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()).failing(&["X"]));
        let endpoints = Arc::new(StaticEndpoints::new(["X", "Y", "Z"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers);

        let started = h.next(EventKind::GenerationStarted).await;
        assert_eq!(started.generation, Some(1));
        assert_eq!(started.workers, Some(3));
        until(|| probe.running() == 2).await;

        h.stop().await;
        assert_eq!(probe.running(), 0);
        assert!(!h.sup.is_active());
    }

    #[tokio::test]
    async fn test_reload_rebuilds_from_fresh_endpoints() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["X", "Y"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints.clone(), consumers.clone());

        h.next(EventKind::GenerationStarted).await;
        until(|| probe.running() == 2).await;

        endpoints.replace(["X", "Z"]);
        h.sup.reload();

        let applied = h.next(EventKind::ReloadApplied).await;
        assert_eq!(applied.generation, Some(1));
        let stopped = h.next(EventKind::GenerationStopped).await;
        assert_eq!(stopped.generation, Some(1));
        let started = h.next(EventKind::GenerationStarted).await;
        assert_eq!(started.generation, Some(2));
        assert_eq!(started.workers, Some(3));
        until(|| probe.running() == 2).await;

        assert_eq!(consumers.attempted(), vec!["X", "Y", "X", "Z"]);
        assert_eq!(h.sup.generation(), 2);

        h.stop().await;
        assert_eq!(probe.started(), 4);
        assert_eq!(probe.peak(), 2, "generations must never overlap");
    }

    #[tokio::test]
    async fn test_repeated_reloads_never_overlap_generations() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["A", "B", "C"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers);

        for expected in 1..=5u64 {
            let started = h.next(EventKind::GenerationStarted).await;
            assert_eq!(started.generation, Some(expected));
            until(|| probe.running() == 3).await;
            h.sup.reload();
            h.next(EventKind::GenerationStopped).await;
        }

        h.stop().await;
        assert_eq!(probe.peak(), 3);
    }

    #[tokio::test]
    async fn test_failed_build_stops_loop_but_run_waits_for_shutdown() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()).failing(&["X", "Y"]));
        let endpoints = Arc::new(StaticEndpoints::new(["X", "Y"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers.clone());

        let failed = h.next(EventKind::GenerationFailed).await;
        assert_eq!(failed.generation, Some(1));
        assert!(failed.reason.as_deref().unwrap_or("").contains("no usable consumer"));

        // No retry: reload has nobody to restart.
        h.sup.reload();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(consumers.attempted(), vec!["X", "Y"]);
        assert_eq!(probe.started(), 0);
        assert_eq!(h.sup.generation(), 0);

        assert!(h.sup.is_active());
        assert_eq!(h.group.outstanding(), 1, "run must not return before shutdown");

        h.stop().await;
        assert!(!h.sup.is_active());
    }

    #[tokio::test]
    async fn test_shutdown_drains_running_generation() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["X", "Y"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers);

        h.next(EventKind::GenerationStarted).await;
        until(|| probe.running() == 2).await;

        h.stop().await;
        assert_eq!(probe.running(), 0);
        assert_eq!(h.sup.generation(), 1);

        let kinds: Vec<EventKind> = std::iter::from_fn(|| h.rx.try_recv().ok())
            .map(|ev| ev.kind)
            .filter(|kind| {
                matches!(
                    kind,
                    EventKind::ShutdownRequested
                        | EventKind::GenerationStopped
                        | EventKind::AllStoppedWithin
                        | EventKind::SupervisorStopped
                )
            })
            .collect();
        assert_eq!(kinds.len(), 4, "{kinds:?}");
        assert_eq!(kinds[2..], [EventKind::AllStoppedWithin, EventKind::SupervisorStopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_worker_exceeds_grace_but_run_returns() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()).stubborn());
        let endpoints = Arc::new(StaticEndpoints::new(["X"]));
        let cfg = SupervisorConfig {
            grace: Duration::from_secs(2),
            ..SupervisorConfig::default()
        };
        let mut h = Harness::start(cfg, endpoints, consumers);

        h.next(EventKind::GenerationStarted).await;
        until(|| probe.running() == 1).await;

        h.shutdown.cancel();
        let exceeded = h.next(EventKind::GraceExceeded).await;
        assert_eq!(exceeded.generation, Some(1));
        h.stop().await;
        assert_eq!(probe.running(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rerun_refused_while_stuck_generation_drains() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()).stubborn());
        let endpoints = Arc::new(StaticEndpoints::new(["X"]));
        let cfg = SupervisorConfig {
            grace: Duration::from_millis(50),
            ..SupervisorConfig::default()
        };
        let mut h = Harness::start(cfg, endpoints, consumers.clone());

        h.next(EventKind::GenerationStarted).await;
        until(|| probe.running() == 1).await;
        h.shutdown.cancel();
        h.next(EventKind::GraceExceeded).await;
        h.stop().await;

        let again = JoinGroup::new();
        tokio::time::timeout(WAIT, Arc::clone(&h.sup).run(again.slot(), CancellationToken::new()))
            .await
            .expect("run returns while the stuck generation is alive");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(again.outstanding(), 0);
        assert!(!h.sup.is_active());
        assert_eq!(h.sup.generation(), 1);
        assert_eq!(consumers.attempted(), vec!["X"]);
        assert_eq!(probe.peak(), 1, "generations must never overlap");
    }

    #[tokio::test]
    async fn test_run_again_after_clean_shutdown() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["X"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers);

        h.next(EventKind::GenerationStarted).await;
        until(|| probe.running() == 1).await;
        h.stop().await;

        let again = JoinGroup::new();
        let shutdown = CancellationToken::new();
        tokio::spawn(Arc::clone(&h.sup).run(again.slot(), shutdown.clone()));

        let started = h.next(EventKind::GenerationStarted).await;
        assert_eq!(started.generation, Some(2));
        until(|| probe.running() == 1).await;

        shutdown.cancel();
        tokio::time::timeout(WAIT, again.wait())
            .await
            .expect("second run releases its slot");
        assert_eq!(probe.peak(), 1);
    }

    #[derive(Default)]
    struct Kinds(std::sync::Mutex<Vec<EventKind>>);

    #[async_trait::async_trait]
    impl Subscribe for Kinds {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "kinds"
        }
    }

    #[tokio::test]
    async fn test_close_flushes_subscribers() {
        let probe = Probe::shared();
        let kinds = Arc::new(Kinds::default());
        let subs: Vec<Arc<dyn Subscribe>> = vec![kinds.clone()];
        let sup = Supervisor::builder(
            SupervisorConfig::default(),
            Arc::new(StaticEndpoints::new(["X"])),
            Arc::new(FakeSinks::ok()),
            Arc::new(FakeConsumers::new(probe.clone())),
        )
        .with_subscribers(subs)
        .build();

        let group = JoinGroup::new();
        let shutdown = CancellationToken::new();
        tokio::spawn(Arc::clone(&sup).run(group.slot(), shutdown.clone()));
        until(|| probe.running() == 1).await;

        shutdown.cancel();
        group.wait().await;
        sup.close().await;

        let seen = kinds.0.lock().unwrap().clone();
        assert!(seen.contains(&EventKind::GenerationStarted), "{seen:?}");
        assert_eq!(seen.last(), Some(&EventKind::SupervisorStopped));
    }

    #[tokio::test]
    async fn test_pending_reloads_coalesce_into_one() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["X"]));
        let sup = Supervisor::builder(
            SupervisorConfig::default(),
            endpoints,
            Arc::new(FakeSinks::ok()),
            consumers,
        )
        .build();

        // No generation is listening yet: must not panic nor block.
        sup.reload();
        sup.reload();
        sup.reload();

        let rx = sup.subscribe();
        let group = JoinGroup::new();
        let shutdown = CancellationToken::new();
        tokio::spawn(Arc::clone(&sup).run(group.slot(), shutdown.clone()));
        let mut h = Harness {
            sup,
            rx,
            group,
            shutdown,
        };

        let first = h.next(EventKind::ReloadApplied).await;
        assert_eq!(first.generation, Some(1));
        let second = h.next(EventKind::GenerationStarted).await;
        assert_eq!(second.generation, Some(2));

        until(|| probe.running() == 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(h.sup.generation(), 2);

        h.stop().await;
    }

    #[tokio::test]
    async fn test_second_run_is_rejected() {
        let probe = Probe::shared();
        let consumers = Arc::new(FakeConsumers::new(probe.clone()));
        let endpoints = Arc::new(StaticEndpoints::new(["X"]));
        let mut h = Harness::start(SupervisorConfig::default(), endpoints, consumers);
        h.next(EventKind::GenerationStarted).await;

        let other = JoinGroup::new();
        tokio::time::timeout(WAIT, Arc::clone(&h.sup).run(other.slot(), CancellationToken::new()))
            .await
            .expect("second run returns immediately");
        assert_eq!(other.outstanding(), 0);
        assert!(h.sup.is_active());

        h.stop().await;
    }
}
