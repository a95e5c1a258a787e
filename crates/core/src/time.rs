//! Epoch and calendar helpers shared across the pipeline.
//!
//! Day rollover for the context counters uses UTC day boundaries, while
//! rule and trigger windows use local hour-of-day. The asymmetry mirrors
//! the companion app's behavior and is intentional.

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike, Utc};

/// Seconds since the Unix epoch.
pub fn epoch_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// UTC day ordinal, for rollover comparisons.
pub fn utc_day(epoch: f64) -> i64 {
    (epoch as i64).div_euclid(86_400)
}

fn to_local(epoch: f64) -> DateTime<Local> {
    DateTime::<Utc>::from_timestamp(epoch as i64, 0)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Local hour of day in `[0, 23]`.
pub fn local_hour(epoch: f64) -> u32 {
    to_local(epoch).hour()
}

/// Local hour of day with minutes and seconds as a fraction.
pub fn local_fractional_hour(epoch: f64) -> f64 {
    let dt = to_local(epoch);
    dt.hour() as f64 + dt.minute() as f64 / 60.0 + dt.second() as f64 / 3600.0
}

/// Local day of week, 0 = Sunday through 6 = Saturday.
pub fn local_weekday(epoch: f64) -> u32 {
    to_local(epoch).weekday().num_days_from_sunday()
}

/// Epoch seconds for a local calendar time.
///
/// Keeps time-of-day assertions timezone-independent; returns the earlier
/// instant on DST ambiguity.
pub fn local_epoch(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> f64 {
    Local
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .earliest()
        .map(|dt| dt.timestamp() as f64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utc_day_boundaries() {
        assert_eq!(utc_day(0.0), 0);
        assert_eq!(utc_day(86_399.9), 0);
        assert_eq!(utc_day(86_400.0), 1);
        assert_eq!(utc_day(-1.0), -1);
    }

    #[test]
    fn local_epoch_round_trips_hour() {
        let epoch = local_epoch(2026, 2, 19, 8, 30);
        assert_eq!(local_hour(epoch), 8);
        assert!((local_fractional_hour(epoch) - 8.5).abs() < 1e-9);
    }

    #[test]
    fn weekday_is_sunday_based() {
        // 2026-02-22 is a Sunday in every timezone at noon local.
        let sunday_noon = local_epoch(2026, 2, 22, 12, 0);
        assert_eq!(local_weekday(sunday_noon), 0);
        let monday_noon = local_epoch(2026, 2, 23, 12, 0);
        assert_eq!(local_weekday(monday_noon), 1);
    }
}
