use std::collections::VecDeque;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use display_engine::{
    recognizer_from_config, AnchorKey, MetricsAccumulator, MetricsHandle, PlaybackConfig,
    PlaybackManager, ReconcileStats, TickReport, TriggerEvent, TriggerScheduler,
};
use tracing::{debug, info, warn};

use super::bootstrap::AppWiring;
use super::scenario::{anchor_at, Scenario, ScriptedAction, ScriptedEvent};
use super::sim_world::{DisplayEntityId, SimWorld, WorldId};

#[derive(Debug, Clone)]
pub(crate) struct LoopConfig {
    pub(crate) target_tps: u32,
    pub(crate) max_frame_delta: Duration,
    pub(crate) max_ticks_per_frame: u32,
    pub(crate) metrics_log_interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 20,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
        }
    }
}

impl LoopConfig {
    pub(crate) fn for_playback(config: &PlaybackConfig) -> Self {
        Self {
            target_tps: config.ticks_per_second,
            ..Self::default()
        }
    }
}

/// Everything one simulated server owns: the world, the playback engine and
/// the scripted events still to come.
pub(crate) struct HostState {
    world: SimWorld,
    manager: PlaybackManager<WorldId, DisplayEntityId>,
    triggers: TriggerScheduler<WorldId>,
    timeline: VecDeque<ScriptedEvent>,
    tick: u64,
    peak_entities: usize,
}

impl HostState {
    pub(crate) fn new(
        config: &PlaybackConfig,
        manager: PlaybackManager<WorldId, DisplayEntityId>,
        scenario: &Scenario,
    ) -> Self {
        let mut world = SimWorld::new(recognizer_from_config(config))
            .with_entity_limit(scenario.entity_limit);
        for jukebox in &scenario.jukeboxes {
            world.place_jukebox(anchor_at(jukebox.at), WorldId(jukebox.world));
        }
        Self {
            world,
            manager,
            triggers: TriggerScheduler::from_config(config),
            timeline: scenario.timeline().into(),
            tick: 0,
            peak_entities: 0,
        }
    }

    pub(crate) fn current_tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn world(&self) -> &SimWorld {
        &self.world
    }

    pub(crate) fn is_playing(&self, anchor: AnchorKey) -> bool {
        self.manager.is_playing(anchor)
    }

    /// Runs one server tick: scripted events, due trigger checks, then
    /// playback.
    pub(crate) fn step(&mut self) -> TickReport {
        let tick = self.tick;
        while self
            .timeline
            .front()
            .is_some_and(|event| event.tick <= tick)
        {
            if let Some(event) = self.timeline.pop_front() {
                self.apply_scripted(event.action);
            }
        }

        self.triggers.run_due(tick, &mut self.manager, &mut self.world);
        let report = self.manager.tick(&mut self.world, tick);

        self.peak_entities = self.peak_entities.max(self.world.entity_count());
        self.tick = self.tick.saturating_add(1);
        report
    }

    pub(crate) fn shutdown(&mut self) -> ReconcileStats {
        self.manager.stop_all(&mut self.world)
    }

    fn apply_scripted(&mut self, action: ScriptedAction) {
        let tick = self.tick;
        let event = match action {
            ScriptedAction::Insert { at, disc } => {
                let anchor = anchor_at(at);
                let item = disc.to_item();
                match self.world.insert_disc(anchor, item.clone()) {
                    Ok(world) => TriggerEvent::DiscInserted {
                        anchor,
                        world,
                        item,
                    },
                    Err(error) => return reject(tick, &error),
                }
            }
            ScriptedAction::FeederInsert { at, disc } => {
                let anchor = anchor_at(at);
                let item = disc.to_item();
                match self.world.insert_disc(anchor, item.clone()) {
                    Ok(world) => TriggerEvent::FeederInserted {
                        anchor,
                        world,
                        item,
                    },
                    Err(error) => return reject(tick, &error),
                }
            }
            ScriptedAction::Eject { at } => {
                let anchor = anchor_at(at);
                match self.world.eject_disc(anchor) {
                    Ok((world, _)) => TriggerEvent::DiscEjected { anchor, world },
                    Err(error) => return reject(tick, &error),
                }
            }
            ScriptedAction::Break { at } => {
                let anchor = anchor_at(at);
                match self.world.break_jukebox(anchor) {
                    Ok(_) => TriggerEvent::SourceBroken { anchor },
                    Err(error) => return reject(tick, &error),
                }
            }
            ScriptedAction::ReloadFrames => {
                let frame_count = self.manager.frame_store_mut().reload();
                info!(tick, frame_count, "frames_reloaded");
                return;
            }
        };

        let anchor = event.anchor();
        let disposition = self
            .triggers
            .submit(event, tick, &mut self.manager, &mut self.world);
        debug!(tick, %anchor, disposition = ?disposition, "scripted_action_applied");
    }
}

fn reject(tick: u64, error: &impl std::fmt::Display) {
    warn!(tick, error = %error, "scripted_action_rejected");
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        playback,
        paths,
        scenario,
        loop_config,
    } = app;

    let manager = PlaybackManager::from_config(&playback, &paths.root);
    let mut state = HostState::new(&playback, manager, &scenario);
    let metrics = MetricsHandle::default();
    let mut accumulator = MetricsAccumulator::new(loop_config.metrics_log_interval);

    info!(
        target_tps = loop_config.target_tps,
        total_ticks = scenario.total_ticks,
        realtime = scenario.realtime,
        max_ticks_per_frame = loop_config.max_ticks_per_frame,
        "loop_started"
    );

    if scenario.realtime {
        run_realtime(
            &mut state,
            &loop_config,
            scenario.total_ticks,
            &mut accumulator,
            &metrics,
        );
    } else {
        while state.current_tick() < scenario.total_ticks {
            run_tick(&mut state, &mut accumulator, &metrics);
        }
    }

    let stats = state.shutdown();
    let last_metrics = metrics.snapshot();
    info!(
        ticks = state.current_tick(),
        last_tps = last_metrics.tps,
        last_tick_time_ms = last_metrics.tick_time_ms,
        sessions_started = state.world().started().len(),
        frame_count = state.manager.frame_store().frame_count(),
        pending_triggers = state.triggers.pending_count(),
        peak_entities = state.peak_entities,
        removed_on_shutdown = stats.removed,
        live_entities = state.world().entity_count(),
        "shutdown"
    );
    ExitCode::SUCCESS
}

fn run_realtime(
    state: &mut HostState,
    loop_config: &LoopConfig,
    total_ticks: u64,
    metrics: &mut MetricsAccumulator,
    handle: &MetricsHandle,
) {
    let fixed_dt = Duration::from_secs_f64(1.0 / f64::from(loop_config.target_tps.max(1)));
    let mut sim_accumulator = Duration::ZERO;
    let mut last_wake = Instant::now();

    while state.current_tick() < total_ticks {
        let now = Instant::now();
        let frame_dt = clamp_frame_delta(
            now.saturating_duration_since(last_wake),
            loop_config.max_frame_delta,
        );
        last_wake = now;
        sim_accumulator = sim_accumulator.saturating_add(frame_dt);

        let step_plan =
            plan_sim_steps(sim_accumulator, fixed_dt, loop_config.max_ticks_per_frame);
        sim_accumulator = step_plan.remaining_accumulator;
        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame = loop_config.max_ticks_per_frame,
                "sim_clamp_triggered"
            );
        }

        for _ in 0..step_plan.ticks_to_run {
            if state.current_tick() >= total_ticks {
                break;
            }
            run_tick(state, metrics, handle);
        }

        thread::sleep(fixed_dt.saturating_sub(sim_accumulator));
    }
}

fn run_tick(state: &mut HostState, metrics: &mut MetricsAccumulator, handle: &MetricsHandle) {
    let started = Instant::now();
    let report = state.step();
    metrics.record_tick(started.elapsed(), &report, state.manager.session_count());

    if let Some(fresh) = metrics.maybe_snapshot(Instant::now()) {
        handle.publish(fresh);
        let snapshot = handle.snapshot();
        info!(
            tps = snapshot.tps,
            tick_time_ms = snapshot.tick_time_ms,
            entity_ops = snapshot.entity_ops,
            created = snapshot.entities.created,
            removed = snapshot.entities.removed,
            failed = snapshot.entities.failed,
            active_sessions = snapshot.active_sessions,
            live_entities = state.world().entity_count(),
            "tick_metrics"
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}
