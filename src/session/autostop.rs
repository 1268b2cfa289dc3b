//! Autostop decision for a running recording

/// Duration limit for a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutostopConfig {
    /// Stop after this many seconds; 0 disables autostop
    pub limit_secs: u64,
}

impl AutostopConfig {
    pub fn new(limit_secs: u64) -> Self {
        Self { limit_secs }
    }

    /// Run until the user stops
    pub fn disabled() -> Self {
        Self { limit_secs: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit_secs > 0
    }

    /// Frame index at which the limit is reached for the given rate
    pub fn target_frame(&self, observed_fps: f64) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }
        Some((observed_fps * self.limit_secs as f64).floor() as u64)
    }
}

/// Whether the recording should stop on this frame.
///
/// The observed rate moves from frame to frame, so the target frame index can
/// be stepped over. Any frame at or past the target stops the recording.
pub fn should_stop(
    frame_index: u64,
    observed_fps: f64,
    config: &AutostopConfig,
    user_requested_stop: bool,
) -> bool {
    if user_requested_stop {
        return true;
    }

    match config.target_frame(observed_fps) {
        Some(target) => frame_index >= target,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_request_always_stops() {
        assert!(should_stop(1, 30.0, &AutostopConfig::disabled(), true));
        assert!(should_stop(1, 30.0, &AutostopConfig::new(60), true));
    }

    #[test]
    fn disabled_limit_never_stops_on_duration() {
        let config = AutostopConfig::disabled();
        for frame in [0, 1, 30, 1_000_000, u64::MAX] {
            for fps in [0.5, 30.0, 240.0] {
                assert!(!should_stop(frame, fps, &config, false));
            }
        }
    }

    #[test]
    fn stops_exactly_at_target_frame() {
        let config = AutostopConfig::new(1);
        assert!(!should_stop(29, 30.0, &config, false));
        assert!(should_stop(30, 30.0, &config, false));
    }

    #[test]
    fn stops_when_target_frame_is_skipped() {
        // The rate dropped between frames, moving the target below the index
        let config = AutostopConfig::new(2);
        assert_eq!(config.target_frame(29.4), Some(58));
        assert!(should_stop(60, 29.4, &config, false));
    }

    #[test]
    fn stops_no_later_than_ceiling_of_rate_times_limit() {
        for limit in [1u64, 2, 5, 60] {
            let config = AutostopConfig::new(limit);
            for fps in [1.0, 12.5, 23.976, 29.97, 30.0, 59.94, 60.0] {
                let ceiling = (fps * limit as f64).ceil() as u64;
                let first_stop = (1..=ceiling + 1)
                    .find(|&frame| should_stop(frame, fps, &config, false))
                    .expect("autostop never fired");
                assert!(first_stop <= ceiling, "fps={} limit={}", fps, limit);
            }
        }
    }
}
