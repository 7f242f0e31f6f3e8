//! Media time representation.
//!
//! Presentation timestamps coming out of the demuxer and decoders are
//! microseconds, so the whole engine works in signed microseconds. Segment
//! start times supplied by the controlling application arrive as seconds
//! (`f64`) and are converted at the boundary.

/// Media time in microseconds.
pub type Time = i64;

/// Time constants for conversions
pub mod constants {
    use super::Time;

    pub const MICROS_PER_SECOND: Time = 1_000_000;
    pub const MICROS_PER_MILLI: Time = 1_000;
}

/// Convert seconds (f64) to microseconds
#[inline]
pub fn from_seconds(seconds: f64) -> Time {
    (seconds * constants::MICROS_PER_SECOND as f64).round() as Time
}

/// Convert microseconds to seconds (f64)
#[inline]
pub fn to_seconds(micros: Time) -> f64 {
    micros as f64 / constants::MICROS_PER_SECOND as f64
}

#[inline]
pub fn from_millis(millis: i64) -> Time {
    millis * constants::MICROS_PER_MILLI
}

#[inline]
pub fn to_millis(micros: Time) -> i64 {
    micros / constants::MICROS_PER_MILLI
}

/// Duration of `samples` frames of audio at `sample_rate`, in microseconds.
#[inline]
pub fn from_samples(samples: u64, sample_rate: u32) -> Time {
    if sample_rate == 0 {
        return 0;
    }
    // i128 keeps long sessions at high rates from overflowing
    ((samples as i128 * constants::MICROS_PER_SECOND as i128) / sample_rate as i128) as Time
}

/// Format time as HH:MM:SS.mmm
pub fn format_time(micros: Time) -> String {
    let sign = if micros < 0 { "-" } else { "" };
    let micros = micros.abs();
    let total_millis = to_millis(micros);
    let hours = total_millis / 3_600_000;
    let minutes = (total_millis % 3_600_000) / 60_000;
    let seconds = (total_millis % 60_000) / 1000;
    let millis = total_millis % 1000;

    format!("{}{:02}:{:02}:{:02}.{:03}", sign, hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_conversion() {
        let time = from_seconds(1.5);
        assert_eq!(time, 1_500_000);
        assert!((to_seconds(time) - 1.5).abs() < 0.000001);
    }

    #[test]
    fn test_millis_conversion() {
        assert_eq!(from_millis(33), 33_000);
        assert_eq!(to_millis(33_999), 33);
    }

    #[test]
    fn test_sample_duration() {
        assert_eq!(from_samples(48_000, 48_000), 1_000_000);
        assert_eq!(from_samples(441, 44_100), 10_000);
        assert_eq!(from_samples(100, 0), 0);
    }

    #[test]
    fn test_format_time() {
        let time = from_seconds(3661.5);
        assert_eq!(format_time(time), "01:01:01.500");
        assert_eq!(format_time(-from_millis(250)), "-00:00:00.250");
    }
}
