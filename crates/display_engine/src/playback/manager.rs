use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::config::{PlaybackConfig, UpdatePolicy};
use crate::frames::{FrameLoadOptions, FrameStore};
use crate::render::{
    project_frame, EntityApi, EntityStyle, ProjectionConfig, ReconcileStats, RenderGroup,
};

use super::anchor::AnchorKey;
use super::clock::FrameClock;
use super::session::PlaybackSession;

/// The surrounding application: owns display entities and knows whether a
/// playback source is still present and playing.
pub trait PlaybackHost: EntityApi {
    /// Whether the object at `anchor` still exists and is still playing.
    fn is_source_active(&self, anchor: AnchorKey, world: &Self::World) -> bool;

    /// Called exactly once for every successful `start`.
    fn playback_started(&mut self, anchor: AnchorKey, world: &Self::World);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyPlaying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopReason {
    Requested,
    SourceInvalid,
    Finished,
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub rendered_sessions: usize,
    pub stopped: Vec<(AnchorKey, StopReason)>,
    pub entities: ReconcileStats,
}

/// Owns every active playback session, keyed by anchor.
#[derive(Debug)]
pub struct PlaybackManager<W, H> {
    sessions: HashMap<AnchorKey, PlaybackSession<W, H>>,
    clock: FrameClock,
    loop_enabled: bool,
    projection: ProjectionConfig,
    style: EntityStyle,
    update_policy: UpdatePolicy,
    frames: FrameStore,
}

impl<W, H> PlaybackManager<W, H> {
    pub fn new(config: &PlaybackConfig, frames: FrameStore) -> Self {
        Self {
            sessions: HashMap::new(),
            clock: FrameClock::from_config(config),
            loop_enabled: config.loop_enabled,
            projection: ProjectionConfig::from_config(config),
            style: EntityStyle {
                glyph: " ".to_string(),
                teleport_duration: config.teleport_duration,
                interpolation_duration: config.interpolation_duration,
            },
            update_policy: config.update_policy,
            frames,
        }
    }

    /// Frames are read lazily from `data_root` joined with the configured
    /// frames directory.
    pub fn from_config(config: &PlaybackConfig, data_root: &Path) -> Self {
        let frames = FrameStore::new(
            data_root.join(&config.frames_directory),
            FrameLoadOptions::from_config(config),
        );
        Self::new(config, frames)
    }

    pub fn frame_store(&self) -> &FrameStore {
        &self.frames
    }

    pub fn frame_store_mut(&mut self) -> &mut FrameStore {
        &mut self.frames
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_playing(&self, anchor: AnchorKey) -> bool {
        self.sessions.contains_key(&anchor)
    }

    pub fn session(&self, anchor: AnchorKey) -> Option<&PlaybackSession<W, H>> {
        self.sessions.get(&anchor)
    }

    pub fn anchors(&self) -> Vec<AnchorKey> {
        let mut anchors: Vec<AnchorKey> = self.sessions.keys().copied().collect();
        anchors.sort();
        anchors
    }

    /// Begins playback at `anchor`. A second start for an occupied anchor is
    /// a no-op, unless its non-looping video has already finished; that
    /// session is torn down and replaced.
    pub fn start<A>(
        &mut self,
        host: &mut A,
        anchor: AnchorKey,
        world: W,
        current_tick: u64,
    ) -> StartOutcome
    where
        A: PlaybackHost<World = W, Handle = H>,
    {
        match self.sessions.get(&anchor) {
            Some(session) if session.is_finished() => {
                self.detach(host, anchor, StopReason::Finished);
            }
            Some(_) => {
                debug!(%anchor, "playback_already_active");
                return StartOutcome::AlreadyPlaying;
            }
            None => {}
        }

        let frame_count = self.frames.ensure_loaded();
        let group = RenderGroup::new(self.style.clone(), self.update_policy);
        let session = PlaybackSession::new(anchor, world, current_tick, self.loop_enabled, group);
        host.playback_started(anchor, session.world());
        self.sessions.insert(anchor, session);
        info!(
            %anchor,
            start_tick = current_tick,
            frame_count,
            looping = self.loop_enabled,
            "playback_started"
        );
        StartOutcome::Started
    }

    /// Ends playback at `anchor` and removes all of its entities. Returns
    /// `None` when nothing was playing there.
    pub fn stop<A>(&mut self, host: &mut A, anchor: AnchorKey) -> Option<ReconcileStats>
    where
        A: EntityApi<World = W, Handle = H>,
    {
        self.detach(host, anchor, StopReason::Requested)
    }

    pub fn stop_all<A>(&mut self, host: &mut A) -> ReconcileStats
    where
        A: EntityApi<World = W, Handle = H>,
    {
        let mut total = ReconcileStats::default();
        for anchor in self.anchors() {
            if let Some(stats) = self.detach(host, anchor, StopReason::Shutdown) {
                total.accumulate(stats);
            }
        }
        total
    }

    /// Advances every session to `current_tick`. Sessions whose source has
    /// gone away, or whose non-looping video ended on the previous tick, are
    /// torn down after all sessions have been visited.
    pub fn tick<A>(&mut self, host: &mut A, current_tick: u64) -> TickReport
    where
        A: PlaybackHost<World = W, Handle = H>,
    {
        let mut report = TickReport::default();
        let mut ended = Vec::<(AnchorKey, StopReason)>::new();
        let frame_count = self.frames.frame_count();

        for (anchor, session) in self.sessions.iter_mut() {
            if session.is_finished() {
                ended.push((*anchor, StopReason::Finished));
                continue;
            }
            if !host.is_source_active(*anchor, session.world()) {
                ended.push((*anchor, StopReason::SourceInvalid));
                continue;
            }

            let elapsed = session.elapsed_ticks(current_tick);
            let Some(index) = self.clock.frame_index(elapsed, frame_count, session.loop_enabled())
            else {
                continue;
            };
            if !session.loop_enabled() && self.clock.is_past_end(elapsed, frame_count) {
                session.mark_finished();
            }
            let Some(frame) = self.frames.frame(index) else {
                continue;
            };

            let desired = project_frame(frame, anchor.position(), &self.projection);
            let (world, group) = session.parts_mut();
            let stats = group.reconcile(host, world, &desired);
            session.mark_rendered(index);
            report.rendered_sessions += 1;
            report.entities.accumulate(stats);
        }

        ended.sort();
        for (anchor, reason) in ended {
            if let Some(stats) = self.detach(host, anchor, reason) {
                report.entities.accumulate(stats);
                report.stopped.push((anchor, reason));
            }
        }

        report
    }

    fn detach<A>(
        &mut self,
        host: &mut A,
        anchor: AnchorKey,
        reason: StopReason,
    ) -> Option<ReconcileStats>
    where
        A: EntityApi<World = W, Handle = H>,
    {
        let mut session = self.sessions.remove(&anchor)?;
        let (world, group) = session.parts_mut();
        let stats = group.clear(host, world);
        info!(
            %anchor,
            reason = ?reason,
            removed = stats.removed,
            failed = stats.failed,
            "playback_stopped"
        );
        Some(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::frames::{Frame, Rgba};
    use crate::render::{RenderKey, Side};
    use crate::test_support::{FakeHandle, FakeHost};

    const WORLD: u32 = 7;

    fn colors() -> [Rgba; 3] {
        [
            Rgba::opaque(255, 0, 0),
            Rgba::opaque(0, 255, 0),
            Rgba::opaque(0, 0, 255),
        ]
    }

    fn single_pixel_frames() -> FrameStore {
        FrameStore::from_frames(
            colors()
                .iter()
                .map(|color| Frame::filled(1, 1, *color))
                .collect(),
        )
    }

    fn config(frame_rate: u32, loop_enabled: bool) -> PlaybackConfig {
        PlaybackConfig {
            frame_rate,
            ticks_per_second: 20,
            loop_enabled,
            double_sided: false,
            ..PlaybackConfig::default()
        }
    }

    fn manager(frame_rate: u32, loop_enabled: bool) -> PlaybackManager<u32, FakeHandle> {
        PlaybackManager::new(&config(frame_rate, loop_enabled), single_pixel_frames())
    }

    #[test]
    fn start_twice_keeps_one_session_and_one_signal() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, true);
        let anchor = AnchorKey::new(10, 64, -3);

        assert_eq!(
            manager.start(&mut host, anchor, WORLD, 5),
            StartOutcome::Started
        );
        assert_eq!(
            manager.start(&mut host, anchor, WORLD, 9),
            StartOutcome::AlreadyPlaying
        );

        assert_eq!(manager.session_count(), 1);
        assert_eq!(host.started, vec![anchor]);
        assert_eq!(manager.session(anchor).map(|s| s.start_tick()), Some(5));
    }

    #[test]
    fn looping_playback_converts_between_tick_and_frame_rates() {
        let mut host = FakeHost::default();
        let mut manager = manager(10, true);
        let anchor = AnchorKey::new(0, 0, 0);
        manager.start(&mut host, anchor, WORLD, 0);

        for (tick, expected) in [(0u64, 0usize), (10, 2), (20, 1)] {
            let report = manager.tick(&mut host, tick);
            assert_eq!(report.rendered_sessions, 1);
            assert_eq!(
                manager.session(anchor).and_then(|s| s.current_frame()),
                Some(expected),
                "tick {tick}"
            );
            assert_eq!(host.live_colors(), vec![colors()[expected]]);
        }
        assert_eq!(host.created_count(), 1);
    }

    #[test]
    fn non_looping_playback_renders_last_frame_then_stops() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, false);
        let anchor = AnchorKey::new(1, 2, 3);
        manager.start(&mut host, anchor, WORLD, 100);

        for (tick, expected) in [(100u64, 0usize), (101, 1), (102, 2), (103, 2)] {
            let report = manager.tick(&mut host, tick);
            assert!(report.stopped.is_empty(), "tick {tick}");
            assert_eq!(
                manager.session(anchor).and_then(|s| s.current_frame()),
                Some(expected)
            );
        }
        assert!(manager.session(anchor).is_some_and(|s| s.is_finished()));

        let report = manager.tick(&mut host, 104);
        assert_eq!(report.stopped, vec![(anchor, StopReason::Finished)]);
        assert_eq!(report.entities.removed, 1);
        assert!(!manager.is_playing(anchor));
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn finished_session_is_replaced_by_a_start_on_the_same_tick() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, false);
        let anchor = AnchorKey::new(1, 2, 3);
        manager.start(&mut host, anchor, WORLD, 0);
        for tick in 0..=3 {
            manager.tick(&mut host, tick);
        }
        assert!(manager.session(anchor).is_some_and(|s| s.is_finished()));

        assert_eq!(
            manager.start(&mut host, anchor, WORLD, 4),
            StartOutcome::Started
        );
        assert_eq!(host.started, vec![anchor, anchor]);
        assert_eq!(manager.session(anchor).map(|s| s.start_tick()), Some(4));
        assert_eq!(host.live_count(), 0);

        let report = manager.tick(&mut host, 4);
        assert!(report.stopped.is_empty());
        assert_eq!(
            manager.session(anchor).and_then(|s| s.current_frame()),
            Some(0)
        );
        assert_eq!(host.live_colors(), vec![colors()[0]]);
    }

    #[test]
    fn invalid_source_is_torn_down_without_touching_other_sessions() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, true);
        let kept = AnchorKey::new(0, 0, 0);
        let lost = AnchorKey::new(50, 0, 0);
        manager.start(&mut host, kept, WORLD, 0);
        manager.start(&mut host, lost, WORLD, 0);
        manager.tick(&mut host, 0);
        assert_eq!(host.live_count(), 2);
        let origin = RenderKey::new(Side::Forward, 0, 0);
        let kept_handle = manager
            .session(kept)
            .and_then(|s| s.render_group().handle(&origin))
            .copied()
            .expect("kept handle");

        host.inactive.insert(lost);
        let report = manager.tick(&mut host, 1);

        assert_eq!(report.rendered_sessions, 1);
        assert_eq!(report.stopped, vec![(lost, StopReason::SourceInvalid)]);
        assert!(manager.is_playing(kept));
        assert!(!manager.is_playing(lost));
        assert_eq!(host.live_count(), 1);
        assert!(host.live.contains_key(&kept_handle));
    }

    #[test]
    fn sessions_advance_from_their_own_start_tick() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, true);
        let early = AnchorKey::new(0, 0, 0);
        let late = AnchorKey::new(0, 0, 40);
        manager.start(&mut host, early, WORLD, 0);
        manager.start(&mut host, late, WORLD, 2);

        manager.tick(&mut host, 4);

        assert_eq!(
            manager.session(early).and_then(|s| s.current_frame()),
            Some(1)
        );
        assert_eq!(
            manager.session(late).and_then(|s| s.current_frame()),
            Some(2)
        );

        manager.stop(&mut host, early);
        assert_eq!(
            manager.session(late).map(|s| s.render_group().len()),
            Some(1)
        );
    }

    #[test]
    fn stop_removes_entities_and_ignores_unknown_anchors() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, true);
        let anchor = AnchorKey::new(4, 4, 4);

        assert!(manager.stop(&mut host, anchor).is_none());

        manager.start(&mut host, anchor, WORLD, 0);
        manager.tick(&mut host, 0);
        let stats = manager.stop(&mut host, anchor).expect("stopped");

        assert_eq!(stats.removed, 1);
        assert_eq!(host.live_count(), 0);
        assert_eq!(manager.session_count(), 0);
    }

    #[test]
    fn stop_all_clears_every_session() {
        let mut host = FakeHost::default();
        let mut manager = manager(20, true);
        for x in 0..3 {
            manager.start(&mut host, AnchorKey::new(x * 10, 0, 0), WORLD, 0);
        }
        manager.tick(&mut host, 0);

        let stats = manager.stop_all(&mut host);

        assert_eq!(stats.removed, 3);
        assert_eq!(manager.session_count(), 0);
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn zero_frames_still_validates_but_renders_nothing() {
        let mut host = FakeHost::default();
        let mut manager: PlaybackManager<u32, FakeHandle> =
            PlaybackManager::new(&config(20, false), FrameStore::from_frames(Vec::new()));
        let anchor = AnchorKey::new(0, 0, 0);
        manager.start(&mut host, anchor, WORLD, 0);

        let report = manager.tick(&mut host, 30);
        assert_eq!(report.rendered_sessions, 0);
        assert!(manager.is_playing(anchor));

        host.inactive.insert(anchor);
        let report = manager.tick(&mut host, 31);
        assert_eq!(report.stopped, vec![(anchor, StopReason::SourceInvalid)]);
    }

    #[test]
    fn frames_load_lazily_on_first_start() {
        let root = tempfile::tempdir().expect("tempdir");
        let config = PlaybackConfig {
            video_width: 2,
            video_height: 2,
            ..PlaybackConfig::default()
        };
        let frames_dir = root.path().join(&config.frames_directory);
        fs::create_dir_all(&frames_dir).expect("frames dir");
        for name in ["0001.png", "0002.png"] {
            image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 200, 200, 255]))
                .save(frames_dir.join(name))
                .expect("write frame");
        }

        let mut host = FakeHost::default();
        let mut manager: PlaybackManager<u32, FakeHandle> =
            PlaybackManager::from_config(&config, root.path());
        assert!(!manager.frame_store().is_loaded());

        manager.start(&mut host, AnchorKey::new(0, 0, 0), WORLD, 0);
        assert_eq!(manager.frame_store().frame_count(), 2);

        let report = manager.tick(&mut host, 0);
        assert_eq!(report.entities.created, 8);
    }

    #[test]
    fn frames_read_from_disk_follow_filename_order_at_ten_fps() {
        let root = tempfile::tempdir().expect("tempdir");
        let config = PlaybackConfig {
            video_width: 1,
            video_height: 1,
            ..config(10, true)
        };
        let frames_dir = root.path().join(&config.frames_directory);
        fs::create_dir_all(&frames_dir).expect("frames dir");
        // Written out of order; playback follows the sorted names.
        for (name, color) in [
            ("frame_002.png", colors()[2]),
            ("frame_000.png", colors()[0]),
            ("frame_001.png", colors()[1]),
        ] {
            image::RgbaImage::from_pixel(3, 3, image::Rgba([color.r, color.g, color.b, 255]))
                .save(frames_dir.join(name))
                .expect("write frame");
        }

        let mut host = FakeHost::default();
        let mut manager: PlaybackManager<u32, FakeHandle> =
            PlaybackManager::from_config(&config, root.path());
        let anchor = AnchorKey::new(0, 0, 0);
        manager.start(&mut host, anchor, WORLD, 0);
        assert_eq!(manager.frame_store().frame_count(), 3);

        for (tick, expected) in [(0u64, 0usize), (10, 2), (20, 1)] {
            manager.tick(&mut host, tick);
            assert_eq!(
                manager.session(anchor).and_then(|s| s.current_frame()),
                Some(expected),
                "tick {tick}"
            );
            assert_eq!(host.live_colors(), vec![colors()[expected]], "tick {tick}");
        }
    }
}
