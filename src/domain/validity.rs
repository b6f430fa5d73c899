use crate::domain::timeline::ParkingInterval;

pub const DEFAULT_MIN_DURATION_SECONDS: f64 = 3600.0;
pub const DEFAULT_MAX_ODOMETER_DELTA_KM: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityThresholds {
    pub min_duration_seconds: f64,
    pub max_odometer_delta_km: f64,
}

impl Default for ValidityThresholds {
    fn default() -> Self {
        Self {
            min_duration_seconds: DEFAULT_MIN_DURATION_SECONDS,
            max_odometer_delta_km: DEFAULT_MAX_ODOMETER_DELTA_KM,
        }
    }
}

impl ValidityThresholds {
    /// A gap counts as parking when it lasted longer than the minimum, the
    /// range estimate did not rise, and the car did not move.
    pub fn is_valid(&self, interval: &ParkingInterval) -> bool {
        interval.duration_seconds() > self.min_duration_seconds
            && interval.start_range_km - interval.end_range_km >= 0.0
            && interval.end_odometer_km - interval.start_odometer_km < self.max_odometer_delta_km
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use crate::domain::models::Position;
    use crate::domain::timeline::ParkingInterval;

    use super::ValidityThresholds;

    fn parked(seconds: i64) -> ParkingInterval {
        let start = Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).unwrap();
        ParkingInterval {
            start_time: start,
            end_time: start + Duration::seconds(seconds),
            start_range_km: 250.0,
            end_range_km: 248.0,
            start_battery_level: Some(60),
            end_battery_level: Some(59),
            start_usable_battery_level: None,
            end_usable_battery_level: None,
            start_odometer_km: 42_000.0,
            end_odometer_km: 42_000.4,
            position: Position {
                latitude: 0.0,
                longitude: 0.0,
            },
            reduced_range: false,
        }
    }

    #[test]
    fn accepts_a_genuine_overnight_parking() {
        assert!(ValidityThresholds::default().is_valid(&parked(8 * 3600)));
    }

    #[test]
    fn rejects_one_hour_or_less() {
        let thresholds = ValidityThresholds::default();
        assert!(!thresholds.is_valid(&parked(3600)));
        assert!(!thresholds.is_valid(&parked(1800)));
        assert!(!thresholds.is_valid(&parked(0)));
        assert!(thresholds.is_valid(&parked(3601)));
    }

    #[test]
    fn rejects_rising_range() {
        let mut recalibrated = parked(8 * 3600);
        recalibrated.end_range_km = 251.0;
        assert!(!ValidityThresholds::default().is_valid(&recalibrated));

        recalibrated.end_range_km = 250.0;
        assert!(ValidityThresholds::default().is_valid(&recalibrated));
    }

    #[test]
    fn rejects_gaps_where_the_car_moved() {
        let mut moved = parked(8 * 3600);
        moved.end_odometer_km = 42_001.0;
        assert!(!ValidityThresholds::default().is_valid(&moved));
    }

    #[test]
    fn honours_custom_thresholds() {
        let relaxed = ValidityThresholds {
            min_duration_seconds: 600.0,
            max_odometer_delta_km: 5.0,
        };
        let mut short_hop = parked(1800);
        short_hop.end_odometer_km = 42_003.0;

        assert!(relaxed.is_valid(&short_hop));
        assert!(!ValidityThresholds::default().is_valid(&short_hop));
    }
}
