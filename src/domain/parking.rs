use chrono::{DateTime, Utc};

use crate::domain::models::StateInterval;
use crate::domain::parking_metrics::{ParkingMetrics, compute_metrics};
use crate::domain::standby::StandbyIndex;
use crate::domain::timeline::ParkingInterval;
use crate::domain::validity::ValidityThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivationSettings {
    pub thresholds: ValidityThresholds,
    pub reduced_range_tolerance_pct: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parking {
    pub interval: ParkingInterval,
    pub duration_seconds: f64,
    pub standby_seconds: f64,
    pub metrics: ParkingMetrics,
}

impl Parking {
    pub fn standby_ratio(&self) -> f64 {
        if self.duration_seconds > 0.0 {
            self.standby_seconds / self.duration_seconds
        } else {
            0.0
        }
    }
}

/// Inclusive bounds on a parking's start (`from`) and end (`until`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateWindow {
    pub fn contains(&self, interval: &ParkingInterval) -> bool {
        self.from.is_none_or(|from| interval.start_time >= from)
            && self.until.is_none_or(|until| interval.end_time <= until)
    }
}

/// Time span covered by all candidate intervals, used to bound the state
/// lookup. `None` when there is nothing to look up.
pub fn candidate_span(intervals: &[ParkingInterval]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = intervals.iter().map(|interval| interval.start_time).min()?;
    let end = intervals.iter().map(|interval| interval.end_time).max()?;
    Some((start, end))
}

/// Computes metrics and standby for every candidate, keeps the plausible
/// ones and returns them most recent first.
pub fn derive_parkings(
    intervals: &[ParkingInterval],
    states: &[StateInterval],
    efficiency: Option<f64>,
    settings: &DerivationSettings,
) -> Vec<Parking> {
    let standby = StandbyIndex::new(states);

    let mut parkings: Vec<Parking> = intervals
        .iter()
        .map(|interval| Parking {
            interval: *interval,
            duration_seconds: interval.duration_seconds(),
            standby_seconds: standby.standby_seconds(interval.start_time, interval.end_time),
            metrics: compute_metrics(interval, efficiency),
        })
        .filter(|parking| settings.thresholds.is_valid(&parking.interval))
        .collect();

    parkings.sort_by(|a, b| b.interval.start_time.cmp(&a.interval.start_time));
    parkings
}
