use tracing::debug;

use crate::config::PlaybackConfig;

use super::anchor::AnchorKey;
use super::discs::{recognizer_from_config, DiscItem, DiscRecognizer};
use super::manager::{PlaybackHost, PlaybackManager, StartOutcome};

/// Something happened to a playback source in the host world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent<W> {
    /// A player put `item` into the source.
    DiscInserted { anchor: AnchorKey, world: W, item: DiscItem },
    /// An automated feeder moved `item` into the source.
    FeederInserted { anchor: AnchorKey, world: W, item: DiscItem },
    /// A player took the disc out.
    DiscEjected { anchor: AnchorKey, world: W },
    /// The source itself was destroyed.
    SourceBroken { anchor: AnchorKey },
}

impl<W> TriggerEvent<W> {
    pub fn anchor(&self) -> AnchorKey {
        match self {
            Self::DiscInserted { anchor, .. }
            | Self::FeederInserted { anchor, .. }
            | Self::DiscEjected { anchor, .. }
            | Self::SourceBroken { anchor } => *anchor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnrecognizedDisc,
    FeederDetectionDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDisposition {
    Scheduled { due_tick: u64 },
    StoppedNow { was_playing: bool },
    Ignored(IgnoreReason),
}

/// Result of one deferred re-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started(AnchorKey),
    AlreadyPlaying(AnchorKey),
    Stopped(AnchorKey),
    NotPlaying(AnchorKey),
    /// The source no longer matched what the event implied.
    Discarded(AnchorKey),
}

#[derive(Debug)]
enum PendingAction {
    Start,
    Stop,
}

#[derive(Debug)]
struct PendingCheck<W> {
    due_tick: u64,
    anchor: AnchorKey,
    world: W,
    action: PendingAction,
}

/// Turns source events into `start`/`stop` calls. Insertions and ejections
/// are re-checked against the host after a short delay so the source has
/// settled into its new state; destruction acts at once.
pub struct TriggerScheduler<W> {
    delay_ticks: u64,
    detect_feeder_insertion: bool,
    recognizer: Box<dyn DiscRecognizer>,
    pending: Vec<PendingCheck<W>>,
}

impl<W> TriggerScheduler<W> {
    pub fn new(
        delay_ticks: u64,
        detect_feeder_insertion: bool,
        recognizer: impl DiscRecognizer + 'static,
    ) -> Self {
        Self {
            delay_ticks,
            detect_feeder_insertion,
            recognizer: Box::new(recognizer),
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(
            config.trigger_delay_ticks,
            config.detect_feeder_insertion,
            recognizer_from_config(config),
        )
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn submit<H, A>(
        &mut self,
        event: TriggerEvent<W>,
        now: u64,
        manager: &mut PlaybackManager<W, H>,
        host: &mut A,
    ) -> TriggerDisposition
    where
        A: PlaybackHost<World = W, Handle = H>,
    {
        let anchor = event.anchor();
        let (world, action) = match event {
            TriggerEvent::SourceBroken { anchor } => {
                let was_playing = manager.stop(host, anchor).is_some();
                debug!(%anchor, was_playing, "trigger_source_broken");
                return TriggerDisposition::StoppedNow { was_playing };
            }
            TriggerEvent::FeederInserted { .. } if !self.detect_feeder_insertion => {
                return self.ignore(anchor, IgnoreReason::FeederDetectionDisabled);
            }
            TriggerEvent::DiscInserted { world, item, .. }
            | TriggerEvent::FeederInserted { world, item, .. } => {
                if !self.recognizer.recognizes(&item) {
                    return self.ignore(anchor, IgnoreReason::UnrecognizedDisc);
                }
                (world, PendingAction::Start)
            }
            TriggerEvent::DiscEjected { world, .. } => (world, PendingAction::Stop),
        };

        let due_tick = now.saturating_add(self.delay_ticks);
        debug!(%anchor, due_tick, action = ?action, "trigger_scheduled");
        self.pending.push(PendingCheck {
            due_tick,
            anchor,
            world,
            action,
        });
        TriggerDisposition::Scheduled { due_tick }
    }

    /// Runs every check due at or before `now`, in submission order.
    pub fn run_due<H, A>(
        &mut self,
        now: u64,
        manager: &mut PlaybackManager<W, H>,
        host: &mut A,
    ) -> Vec<TriggerOutcome>
    where
        A: PlaybackHost<World = W, Handle = H>,
    {
        let mut due = Vec::new();
        let mut waiting = Vec::with_capacity(self.pending.len());
        for check in self.pending.drain(..) {
            if check.due_tick <= now {
                due.push(check);
            } else {
                waiting.push(check);
            }
        }
        self.pending = waiting;

        let mut outcomes = Vec::with_capacity(due.len());
        for check in due {
            let anchor = check.anchor;
            let active = host.is_source_active(anchor, &check.world);
            let outcome = match (check.action, active) {
                (PendingAction::Start, true) => {
                    match manager.start(host, anchor, check.world, now) {
                        StartOutcome::Started => TriggerOutcome::Started(anchor),
                        StartOutcome::AlreadyPlaying => TriggerOutcome::AlreadyPlaying(anchor),
                    }
                }
                (PendingAction::Stop, false) => match manager.stop(host, anchor) {
                    Some(_) => TriggerOutcome::Stopped(anchor),
                    None => TriggerOutcome::NotPlaying(anchor),
                },
                (_, _) => TriggerOutcome::Discarded(anchor),
            };
            debug!(%anchor, outcome = ?outcome, "trigger_checked");
            outcomes.push(outcome);
        }
        outcomes
    }

    fn ignore(&self, anchor: AnchorKey, reason: IgnoreReason) -> TriggerDisposition {
        debug!(%anchor, reason = ?reason, "trigger_ignored");
        TriggerDisposition::Ignored(reason)
    }
}

impl<W> std::fmt::Debug for TriggerScheduler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerScheduler")
            .field("delay_ticks", &self.delay_ticks)
            .field("detect_feeder_insertion", &self.detect_feeder_insertion)
            .field("pending", &self.pending.len())
            .finish()
    }
}
