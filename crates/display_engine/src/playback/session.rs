use crate::render::RenderGroup;

use super::anchor::AnchorKey;

/// Playback state for one anchor, from `start` until it is stopped.
#[derive(Debug)]
pub struct PlaybackSession<W, H> {
    anchor: AnchorKey,
    world: W,
    start_tick: u64,
    loop_enabled: bool,
    render_group: RenderGroup<H>,
    current_frame: Option<usize>,
    finished: bool,
}

impl<W, H> PlaybackSession<W, H> {
    pub(crate) fn new(
        anchor: AnchorKey,
        world: W,
        start_tick: u64,
        loop_enabled: bool,
        render_group: RenderGroup<H>,
    ) -> Self {
        Self {
            anchor,
            world,
            start_tick,
            loop_enabled,
            render_group,
            current_frame: None,
            finished: false,
        }
    }

    pub fn anchor(&self) -> AnchorKey {
        self.anchor
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn start_tick(&self) -> u64 {
        self.start_tick
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn render_group(&self) -> &RenderGroup<H> {
        &self.render_group
    }

    /// Frame rendered by the most recent tick.
    pub fn current_frame(&self) -> Option<usize> {
        self.current_frame
    }

    /// Set once the final frame of a non-looping video has been rendered.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn elapsed_ticks(&self, current_tick: u64) -> u64 {
        current_tick.saturating_sub(self.start_tick)
    }

    pub(crate) fn parts_mut(&mut self) -> (&W, &mut RenderGroup<H>) {
        (&self.world, &mut self.render_group)
    }

    pub(crate) fn mark_rendered(&mut self, frame: usize) {
        self.current_frame = Some(frame);
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished = true;
    }
}
