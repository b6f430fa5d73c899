use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

use crate::adapters::db;
use crate::adapters::db::{DbError, SourceCounts};
use crate::domain::models::{CarProfile, DisplaySettings};
use crate::domain::pager::{PageRequest, paginate};
use crate::domain::parking::{
    DateWindow, DerivationSettings, Parking, candidate_span, derive_parkings,
};
use crate::domain::timeline::{merge_timeline, sequence_intervals};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("database lock poisoned")]
    DbLockPoisoned,
    #[error("database operation failed: {0}")]
    Database(#[from] DbError),
    #[error("car {0} not found")]
    CarNotFound(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParkingRequest {
    pub car_id: i64,
    pub window: DateWindow,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParkingReport {
    pub car: CarProfile,
    pub settings: DisplaySettings,
    pub parkings: Vec<Parking>,
}

pub trait ParkingQueryHandler {
    fn list_parkings(&self, request: &ParkingRequest) -> Result<ParkingReport, ServiceError>;
    fn get_schema_version(&self) -> Result<u32, ServiceError>;
    fn count_source_rows(&self) -> Result<SourceCounts, ServiceError>;
}

#[derive(Clone)]
pub struct SqliteParkingService {
    connection: Arc<Mutex<Connection>>,
    settings: DerivationSettings,
}

impl SqliteParkingService {
    pub fn new(connection: Arc<Mutex<Connection>>, settings: DerivationSettings) -> Self {
        Self {
            connection,
            settings,
        }
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&Connection) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ServiceError::DbLockPoisoned)?;
        op(&connection)
    }
}

impl ParkingQueryHandler for SqliteParkingService {
    fn list_parkings(&self, request: &ParkingRequest) -> Result<ParkingReport, ServiceError> {
        self.with_connection(|connection| {
            let car = db::load_car_profile(connection, request.car_id)?
                .ok_or(ServiceError::CarNotFound(request.car_id))?;
            let settings = db::load_display_settings(connection)?;

            let charges =
                db::load_charge_events(connection, request.car_id, settings.preferred_range)?;
            let drives =
                db::load_drive_events(connection, request.car_id, settings.preferred_range)?;
            let event_count = charges.len() + drives.len();

            let timeline = merge_timeline(charges, drives);
            let intervals =
                sequence_intervals(&timeline, self.settings.reduced_range_tolerance_pct);

            let states = match candidate_span(&intervals) {
                Some((from, until)) => {
                    db::load_state_intervals(connection, request.car_id, from, until)?
                }
                None => Vec::new(),
            };

            let valid = derive_parkings(&intervals, &states, car.efficiency, &self.settings);
            let valid_count = valid.len();
            let windowed: Vec<Parking> = valid
                .into_iter()
                .filter(|parking| request.window.contains(&parking.interval))
                .collect();
            let parkings = paginate(windowed, request.page);

            tracing::debug!(
                car_id = request.car_id,
                events = event_count,
                candidates = intervals.len(),
                states = states.len(),
                valid = valid_count,
                returned = parkings.len(),
                "parkings derived"
            );

            Ok(ParkingReport {
                car,
                settings,
                parkings,
            })
        })
    }

    fn get_schema_version(&self) -> Result<u32, ServiceError> {
        self.with_connection(|connection| Ok(db::schema_version(connection)?))
    }

    fn count_source_rows(&self) -> Result<SourceCounts, ServiceError> {
        self.with_connection(|connection| Ok(db::count_source_rows(connection)?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rusqlite::Connection;

    use crate::adapters::db::{
        NewCarRecord, NewChargingProcessRecord, NewDriveRecord, NewPositionRecord, NewStateRecord,
        insert_car, insert_charging_process, insert_drive, insert_position, insert_state,
    };
    use crate::domain::models::VehicleState;
    use crate::domain::pager::PageRequest;
    use crate::domain::parking::{DateWindow, DerivationSettings};
    use crate::test_support::open_test_connection;

    use super::{ParkingQueryHandler, ParkingRequest, ServiceError, SqliteParkingService};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 20, 18, 0, 0).unwrap()
    }

    fn service_with(connection: Connection) -> (SqliteParkingService, Arc<Mutex<Connection>>) {
        let shared = Arc::new(Mutex::new(connection));
        (
            SqliteParkingService::new(Arc::clone(&shared), DerivationSettings::default()),
            shared,
        )
    }

    fn request(car_id: i64) -> ParkingRequest {
        ParkingRequest {
            car_id,
            window: DateWindow::default(),
            page: PageRequest::new(1, 100),
        }
    }

    fn position(db: &Connection, at: DateTime<Utc>, odometer_km: f64) -> i64 {
        insert_position(
            db,
            &NewPositionRecord {
                car_id: 1,
                date: at,
                latitude: 52.52,
                longitude: 13.405,
                battery_level: Some(70),
                usable_battery_level: Some(70),
                odometer_km,
            },
        )
        .expect("position insert should succeed")
    }

    /// Drive ending at `t0`, charge starting `gap` later with range 300 -> 295.
    fn seed_drive_then_charge(db: &Connection, gap: Duration) {
        insert_car(
            db,
            &NewCarRecord {
                id: 1,
                name: Some("Daily".to_string()),
                efficiency: Some(0.153),
            },
        )
        .expect("car insert should succeed");

        let start = position(db, t0() - Duration::minutes(40), 9_970.0);
        let end = position(db, t0(), 10_000.0);
        insert_drive(
            db,
            &NewDriveRecord {
                car_id: 1,
                start_position_id: start,
                end_position_id: Some(end),
                start_date: t0() - Duration::minutes(40),
                end_date: Some(t0()),
                start_ideal_range_km: 340.0,
                end_ideal_range_km: Some(310.0),
                start_rated_range_km: 330.0,
                end_rated_range_km: Some(300.0),
                start_km: 9_970.0,
                end_km: Some(10_000.0),
            },
        )
        .expect("drive insert should succeed");

        let charge_position = position(db, t0() + gap, 10_000.0);
        insert_charging_process(
            db,
            &NewChargingProcessRecord {
                car_id: 1,
                position_id: charge_position,
                start_date: t0() + gap,
                end_date: Some(t0() + gap + Duration::hours(1)),
                start_ideal_range_km: 305.0,
                end_ideal_range_km: Some(420.0),
                start_rated_range_km: 295.0,
                end_rated_range_km: Some(410.0),
                start_battery_level: Some(69),
                end_battery_level: Some(90),
            },
        )
        .expect("charge insert should succeed");
    }

    #[test]
    fn derives_the_two_hour_parking_with_standby() {
        let connection = open_test_connection("service-two-hours");
        seed_drive_then_charge(&connection, Duration::hours(2));
        insert_state(
            &connection,
            &NewStateRecord {
                car_id: 1,
                state: VehicleState::Asleep,
                start_date: t0() + Duration::minutes(10),
                end_date: Some(t0() + Duration::minutes(100)),
            },
        )
        .expect("state insert should succeed");
        let (service, _) = service_with(connection);

        let report = service
            .list_parkings(&request(1))
            .expect("derivation should succeed");

        assert_eq!(report.car.name.as_deref(), Some("Daily"));
        assert_eq!(report.parkings.len(), 1);
        let parking = report.parkings[0];
        assert_eq!(parking.duration_seconds, 7200.0);
        assert_eq!(parking.standby_seconds, 5400.0);
        assert!((parking.metrics.range_diff_km - 5.0).abs() < 1e-9);
        assert!(parking.metrics.consumption_kwh > 0.0);
        assert!(parking.metrics.avg_power_w > 0.0);
    }

    #[test]
    fn drops_the_half_hour_gap() {
        let connection = open_test_connection("service-half-hour");
        seed_drive_then_charge(&connection, Duration::minutes(30));
        let (service, _) = service_with(connection);

        let report = service
            .list_parkings(&request(1))
            .expect("derivation should succeed");

        assert!(report.parkings.is_empty());
    }

    #[test]
    fn date_window_excludes_parkings_outside_bounds() {
        let connection = open_test_connection("service-window");
        seed_drive_then_charge(&connection, Duration::hours(2));
        let (service, _) = service_with(connection);

        let mut windowed = request(1);
        windowed.window = DateWindow {
            from: Some(t0() + Duration::minutes(1)),
            until: None,
        };

        let report = service
            .list_parkings(&windowed)
            .expect("derivation should succeed");

        assert!(report.parkings.is_empty());
    }

    #[test]
    fn unknown_car_is_reported() {
        let connection = open_test_connection("service-unknown-car");
        let (service, _) = service_with(connection);

        let result = service.list_parkings(&request(42));

        assert!(matches!(result, Err(ServiceError::CarNotFound(42))));
    }

    #[test]
    fn car_without_events_has_no_parkings() {
        let connection = open_test_connection("service-no-events");
        insert_car(
            &connection,
            &NewCarRecord {
                id: 1,
                name: None,
                efficiency: None,
            },
        )
        .expect("car insert should succeed");
        let (service, _) = service_with(connection);

        let report = service
            .list_parkings(&request(1))
            .expect("derivation should succeed");

        assert!(report.parkings.is_empty());
    }

    #[test]
    fn storage_failure_aborts_the_derivation() {
        let connection = open_test_connection("service-broken-store");
        seed_drive_then_charge(&connection, Duration::hours(2));
        connection
            .execute_batch("DROP TABLE states")
            .expect("drop should succeed");
        let (service, _) = service_with(connection);

        let result = service.list_parkings(&request(1));

        assert!(matches!(result, Err(ServiceError::Database(_))));
    }
}
