use chrono::{DateTime, Utc};

use crate::domain::models::StateInterval;

/// Asleep/offline spans of one vehicle, unioned and ordered so that overlap
/// sums never count the same second twice.
#[derive(Debug, Clone, Default)]
pub struct StandbyIndex {
    spans: Vec<(DateTime<Utc>, Option<DateTime<Utc>>)>,
}

impl StandbyIndex {
    pub fn new(states: &[StateInterval]) -> Self {
        let mut candidates: Vec<_> = states
            .iter()
            .filter(|state| state.state.is_standby())
            .map(|state| (state.start_time, state.end_time))
            .collect();
        candidates.sort_by_key(|(start, _)| *start);

        let mut spans: Vec<(DateTime<Utc>, Option<DateTime<Utc>>)> = Vec::new();
        for (start, end) in candidates {
            if let Some((_, last_end)) = spans.last_mut()
                && last_end.is_none_or(|last_end| start <= last_end)
            {
                *last_end = match (*last_end, end) {
                    (Some(last), Some(end)) => Some(last.max(end)),
                    _ => None,
                };
                continue;
            }
            spans.push((start, end));
        }

        Self { spans }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Seconds of `[start, end]` covered by standby spans; an open span
    /// reaches the end of the window. Always within `0..=end - start`.
    pub fn standby_seconds(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
        if end <= start {
            return 0.0;
        }

        let candidates = self.spans.partition_point(|(span_start, _)| *span_start < end);
        let millis: i64 = self.spans[..candidates]
            .iter()
            .filter_map(|(span_start, span_end)| {
                let clipped_start = (*span_start).max(start);
                let clipped_end = span_end.map_or(end, |span_end| span_end.min(end));
                (clipped_end > clipped_start)
                    .then(|| (clipped_end - clipped_start).num_milliseconds())
            })
            .sum();

        millis as f64 / 1000.0
    }
}
