use crate::config::PlaybackConfig;

/// Converts simulation ticks into video frame positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameClock {
    frame_rate: u32,
    ticks_per_second: u32,
}

impl FrameClock {
    /// Zero rates are raised to 1.
    pub fn new(frame_rate: u32, ticks_per_second: u32) -> Self {
        Self {
            frame_rate: frame_rate.max(1),
            ticks_per_second: ticks_per_second.max(1),
        }
    }

    pub fn from_config(config: &PlaybackConfig) -> Self {
        Self::new(config.frame_rate, config.ticks_per_second)
    }

    pub fn frames_elapsed(&self, elapsed_ticks: u64) -> u64 {
        let frames = u128::from(elapsed_ticks) * u128::from(self.frame_rate)
            / u128::from(self.ticks_per_second);
        u64::try_from(frames).unwrap_or(u64::MAX)
    }

    /// Frame to show after `elapsed_ticks`, wrapping when looping and holding
    /// the last frame otherwise. `None` when there are no frames.
    pub fn frame_index(
        &self,
        elapsed_ticks: u64,
        frame_count: usize,
        looping: bool,
    ) -> Option<usize> {
        if frame_count == 0 {
            return None;
        }
        let frames = self.frames_elapsed(elapsed_ticks);
        let count = frame_count as u64;
        let index = if looping {
            frames % count
        } else {
            frames.min(count - 1)
        };
        Some(index as usize)
    }

    /// Whether `elapsed_ticks` has reached the full video duration,
    /// `frame_count / frame_rate` seconds.
    pub fn is_past_end(&self, elapsed_ticks: u64, frame_count: usize) -> bool {
        u128::from(elapsed_ticks) * u128::from(self.frame_rate)
            >= frame_count as u128 * u128::from(self.ticks_per_second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_rates_loop_by_modulo() {
        let clock = FrameClock::new(20, 20);
        for elapsed in 0..100u64 {
            assert_eq!(
                clock.frame_index(elapsed, 7, true),
                Some((elapsed % 7) as usize)
            );
        }
    }

    #[test]
    fn matching_rates_clamp_to_last_frame() {
        let clock = FrameClock::new(20, 20);
        for elapsed in 0..40u64 {
            assert_eq!(
                clock.frame_index(elapsed, 10, false),
                Some(elapsed.min(9) as usize)
            );
            assert_eq!(clock.is_past_end(elapsed, 10), elapsed >= 10);
        }
    }

    #[test]
    fn half_frame_rate_advances_every_other_tick() {
        let clock = FrameClock::new(10, 20);
        assert_eq!(clock.frame_index(0, 3, true), Some(0));
        assert_eq!(clock.frame_index(1, 3, true), Some(0));
        assert_eq!(clock.frame_index(10, 3, true), Some(2));
        assert_eq!(clock.frame_index(20, 3, true), Some(1));
        assert!(!clock.is_past_end(5, 3));
        assert!(clock.is_past_end(6, 3));
    }

    #[test]
    fn higher_frame_rate_skips_frames() {
        let clock = FrameClock::new(30, 20);
        assert_eq!(clock.frames_elapsed(1), 1);
        assert_eq!(clock.frames_elapsed(2), 3);
        assert_eq!(clock.frame_index(2, 100, false), Some(3));
    }

    #[test]
    fn empty_video_has_no_frame() {
        let clock = FrameClock::new(20, 20);
        assert_eq!(clock.frame_index(5, 0, true), None);
        assert!(clock.is_past_end(0, 0));
    }

    #[test]
    fn zero_rates_are_normalized() {
        let clock = FrameClock::new(0, 0);
        assert_eq!(clock, FrameClock::new(1, 1));
        assert_eq!(clock.frames_elapsed(5), 5);
    }
}
