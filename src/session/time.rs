//! Elapsed-time formatting for the recording readout

use std::fmt;
use thiserror::Error;

/// Minutes, seconds and centiseconds shown while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplayTime {
    /// 0..=59, wraps every hour
    pub minutes: u8,
    /// 0..=59
    pub seconds: u8,
    /// 0..=99
    pub centiseconds: u8,
}

impl fmt::Display for DisplayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.minutes, self.seconds, self.centiseconds
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FormatError {
    #[error("invalid frame rate: {0}")]
    InvalidRate(f64),
}

/// Convert a frame count and the observed frame rate into a display time.
///
/// Elapsed time is rounded to the nearest centisecond before whole seconds
/// are floored, so long sessions do not drift behind the wall clock.
pub fn format_time(frame_index: u64, observed_fps: f64) -> Result<DisplayTime, FormatError> {
    if !(observed_fps > 0.0) || !observed_fps.is_finite() {
        return Err(FormatError::InvalidRate(observed_fps));
    }

    let frames = frame_index as f64;
    let total_seconds = ((frames / observed_fps * 100.0).round() / 100.0).floor() as u64;
    let centiseconds = (frames * (100.0 / observed_fps)).round() as u64 % 100;

    Ok(DisplayTime {
        minutes: ((total_seconds / 60) % 60) as u8,
        seconds: (total_seconds % 60) as u8,
        centiseconds: centiseconds as u8,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_second_at_thirty_fps() {
        let time = format_time(30, 30.0).unwrap();
        assert_eq!(
            time,
            DisplayTime {
                minutes: 0,
                seconds: 1,
                centiseconds: 0
            }
        );
        assert_eq!(time.to_string(), "00:01:00");
    }

    #[test]
    fn fractional_seconds_become_centiseconds() {
        let time = format_time(45, 30.0).unwrap();
        assert_eq!(time.seconds, 1);
        assert_eq!(time.centiseconds, 50);
    }

    #[test]
    fn rounds_up_to_the_next_second_near_the_boundary() {
        // 0.9998s rounds to 1.00s instead of truncating to 0.99
        let time = format_time(5999, 6000.0).unwrap();
        assert_eq!(time.seconds, 1);
        assert_eq!(time.centiseconds, 0);
    }

    #[test]
    fn minutes_wrap_every_hour() {
        let time = format_time(61 * 60 * 10, 10.0).unwrap();
        assert_eq!(time.minutes, 1);
        assert_eq!(time.seconds, 0);
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        assert_eq!(format_time(10, 0.0), Err(FormatError::InvalidRate(0.0)));
        assert!(format_time(10, -5.0).is_err());
        assert!(format_time(10, f64::NAN).is_err());
        assert!(format_time(10, f64::INFINITY).is_err());
    }

    #[test]
    fn fields_stay_in_range_and_are_deterministic() {
        for fps in [1.0, 23.976, 29.97, 30.0, 59.94, 60.0, 120.0] {
            for frame in (1..200_000u64).step_by(997) {
                let first = format_time(frame, fps).unwrap();
                let second = format_time(frame, fps).unwrap();
                assert_eq!(first, second);
                assert!(first.minutes < 60);
                assert!(first.seconds < 60);
                assert!(first.centiseconds < 100);
            }
        }
    }
}
