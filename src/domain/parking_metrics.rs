use crate::domain::timeline::ParkingInterval;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParkingMetrics {
    pub soc_diff: i32,
    pub range_diff_km: f64,
    pub consumption_kwh: f64,
    pub avg_power_w: f64,
    pub range_lost_per_hour_km: f64,
}

/// Range-derived metrics are zero for reduced-range intervals, and power and
/// rate are zero whenever the interval has no positive duration.
pub fn compute_metrics(interval: &ParkingInterval, efficiency: Option<f64>) -> ParkingMetrics {
    let soc_diff = match (interval.start_battery_level, interval.end_battery_level) {
        (Some(start), Some(end)) => (start - end).max(0),
        _ => 0,
    };

    if interval.reduced_range {
        return ParkingMetrics {
            soc_diff,
            ..ParkingMetrics::default()
        };
    }

    let range_diff_km = interval.start_range_km - interval.end_range_km;
    let consumption_kwh = efficiency.map_or(0.0, |efficiency| range_diff_km * efficiency);
    let hours = interval.duration_seconds() / SECONDS_PER_HOUR;

    let (avg_power_w, range_lost_per_hour_km) = if hours > 0.0 {
        (consumption_kwh / hours * 1000.0, range_diff_km / hours)
    } else {
        (0.0, 0.0)
    };

    ParkingMetrics {
        soc_diff,
        range_diff_km,
        consumption_kwh,
        avg_power_w,
        range_lost_per_hour_km,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::domain::models::Position;
    use crate::domain::timeline::ParkingInterval;

    use super::{ParkingMetrics, compute_metrics};

    fn interval(seconds: i64) -> ParkingInterval {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap();
        ParkingInterval {
            start_time: start,
            end_time: start + Duration::seconds(seconds),
            start_range_km: 300.0,
            end_range_km: 295.0,
            start_battery_level: Some(70),
            end_battery_level: Some(68),
            start_usable_battery_level: Some(70),
            end_usable_battery_level: Some(68),
            start_odometer_km: 5_000.0,
            end_odometer_km: 5_000.0,
            position: Position {
                latitude: 0.0,
                longitude: 0.0,
            },
            reduced_range: false,
        }
    }

    #[test]
    fn derives_consumption_power_and_rate() {
        let metrics = compute_metrics(&interval(7200), Some(0.15));

        assert_eq!(metrics.soc_diff, 2);
        assert!((metrics.range_diff_km - 5.0).abs() < 1e-9);
        assert!((metrics.consumption_kwh - 0.75).abs() < 1e-9);
        assert!((metrics.avg_power_w - 375.0).abs() < 1e-9);
        assert!((metrics.range_lost_per_hour_km - 2.5).abs() < 1e-9);
    }

    #[test]
    fn clamps_rising_battery_level_to_zero() {
        let mut rising = interval(7200);
        rising.end_battery_level = Some(75);

        assert_eq!(compute_metrics(&rising, Some(0.15)).soc_diff, 0);
    }

    #[test]
    fn missing_battery_level_yields_zero_soc_diff() {
        let mut unknown = interval(7200);
        unknown.start_battery_level = None;

        assert_eq!(compute_metrics(&unknown, Some(0.15)).soc_diff, 0);
    }

    #[test]
    fn reduced_range_zeroes_every_range_metric() {
        let mut reduced = interval(7200);
        reduced.reduced_range = true;

        let metrics = compute_metrics(&reduced, Some(0.15));

        assert_eq!(
            metrics,
            ParkingMetrics {
                soc_diff: 2,
                ..ParkingMetrics::default()
            }
        );
    }

    #[test]
    fn unknown_efficiency_yields_zero_consumption_and_power() {
        let metrics = compute_metrics(&interval(7200), None);

        assert_eq!(metrics.consumption_kwh, 0.0);
        assert_eq!(metrics.avg_power_w, 0.0);
        assert!((metrics.range_lost_per_hour_km - 2.5).abs() < 1e-9);
    }

    #[test]
    fn zero_duration_does_not_divide_by_zero() {
        let metrics = compute_metrics(&interval(0), Some(0.15));

        assert_eq!(metrics.avg_power_w, 0.0);
        assert_eq!(metrics.range_lost_per_hour_km, 0.0);
        assert!(metrics.consumption_kwh > 0.0);
    }
}
