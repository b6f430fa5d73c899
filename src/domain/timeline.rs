use chrono::{DateTime, Utc};

use crate::domain::models::{Boundary, Event, Position};

/// Gap between two consecutive events, before any plausibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingInterval {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub start_range_km: f64,
    pub end_range_km: f64,
    pub start_battery_level: Option<i32>,
    pub end_battery_level: Option<i32>,
    pub start_usable_battery_level: Option<i32>,
    pub end_usable_battery_level: Option<i32>,
    pub start_odometer_km: f64,
    pub end_odometer_km: f64,
    pub position: Position,
    pub reduced_range: bool,
}

impl ParkingInterval {
    /// Builds the gap between `departed` (the preceding event's end) and
    /// `arrived` (the next event's start). Reduced range is judged on the
    /// arriving boundary; see [`is_reduced_range`].
    pub fn between(
        departed: &Boundary,
        arrived: &Boundary,
        position: Position,
        reduced_range_tolerance_pct: i32,
    ) -> Self {
        Self {
            start_time: departed.time,
            end_time: arrived.time,
            start_range_km: departed.range_km,
            end_range_km: arrived.range_km,
            start_battery_level: departed.battery_level,
            end_battery_level: arrived.battery_level,
            start_usable_battery_level: departed.usable_battery_level,
            end_usable_battery_level: arrived.usable_battery_level,
            start_odometer_km: departed.odometer_km,
            end_odometer_km: arrived.odometer_km,
            position,
            reduced_range: is_reduced_range(arrived, reduced_range_tolerance_pct),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// The displayed battery level over-reports usable capacity by more than
/// `tolerance_pct` points.
pub fn is_reduced_range(boundary: &Boundary, tolerance_pct: i32) -> bool {
    match boundary.battery_level {
        Some(level) => level - boundary.usable_battery_level.unwrap_or(level) > tolerance_pct,
        None => false,
    }
}

/// Merges charge and drive events into one timeline ordered by start time.
/// Each input is sorted first; already ordered input stays untouched.
pub fn merge_timeline(mut charges: Vec<Event>, mut drives: Vec<Event>) -> Vec<Event> {
    charges.sort_by_key(Event::start_time);
    drives.sort_by_key(Event::start_time);

    let mut merged = Vec::with_capacity(charges.len() + drives.len());
    let mut charges = charges.into_iter().peekable();
    let mut drives = drives.into_iter().peekable();

    loop {
        let take_charge = match (charges.peek(), drives.peek()) {
            (Some(charge), Some(drive)) => charge.start_time() <= drive.start_time(),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        let next = if take_charge {
            charges.next()
        } else {
            drives.next()
        };
        merged.extend(next);
    }

    merged
}

/// Emits one interval per adjacent pair of the ordered timeline, carrying a
/// single event of lookback. A predecessor without a closing boundary (a
/// charge still in progress) cannot bound a gap and is skipped.
pub fn sequence_intervals(
    timeline: &[Event],
    reduced_range_tolerance_pct: i32,
) -> Vec<ParkingInterval> {
    let mut intervals = Vec::with_capacity(timeline.len().saturating_sub(1));
    let mut previous: Option<&Event> = None;

    for current in timeline {
        if let Some(previous) = previous
            && let Some(departed) = previous.closing()
        {
            intervals.push(ParkingInterval::between(
                &departed,
                &current.opening(),
                previous.position(),
                reduced_range_tolerance_pct,
            ));
        }
        previous = Some(current);
    }

    intervals
}
