use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use thiserror::Error;

use crate::domain::models::{
    CarProfile, ChargeEnd, ChargeEvent, DisplaySettings, DriveEvent, Event, LengthUnit, Position,
    PreferredRange, StateInterval, TemperatureUnit, VehicleState,
};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

// Timestamps are RFC 3339 text. Writers here use `format_timestamp`
// (UTC, milliseconds, `Z`); readers must not rely on that shape.
const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS cars (
    id INTEGER PRIMARY KEY,
    name TEXT,
    efficiency REAL
);

CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    unit_of_length TEXT NOT NULL DEFAULT 'km',
    unit_of_temperature TEXT NOT NULL DEFAULT 'C',
    preferred_range TEXT NOT NULL DEFAULT 'rated'
);

CREATE TABLE IF NOT EXISTS positions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    car_id INTEGER NOT NULL REFERENCES cars (id),
    date TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    battery_level INTEGER,
    usable_battery_level INTEGER,
    odometer REAL NOT NULL
);

CREATE TABLE IF NOT EXISTS charging_processes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    car_id INTEGER NOT NULL REFERENCES cars (id),
    position_id INTEGER NOT NULL REFERENCES positions (id),
    start_date TEXT NOT NULL,
    end_date TEXT,
    start_ideal_range_km REAL NOT NULL,
    end_ideal_range_km REAL,
    start_rated_range_km REAL NOT NULL,
    end_rated_range_km REAL,
    start_battery_level INTEGER,
    end_battery_level INTEGER
);

CREATE TABLE IF NOT EXISTS drives (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    car_id INTEGER NOT NULL REFERENCES cars (id),
    start_position_id INTEGER NOT NULL REFERENCES positions (id),
    end_position_id INTEGER REFERENCES positions (id),
    start_date TEXT NOT NULL,
    end_date TEXT,
    start_ideal_range_km REAL NOT NULL,
    end_ideal_range_km REAL,
    start_rated_range_km REAL NOT NULL,
    end_rated_range_km REAL,
    start_km REAL NOT NULL,
    end_km REAL
);

CREATE TABLE IF NOT EXISTS states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    car_id INTEGER NOT NULL REFERENCES cars (id),
    state TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_charging_processes_car_start
ON charging_processes (car_id, start_date);

CREATE INDEX IF NOT EXISTS idx_drives_car_start
ON drives (car_id, start_date);

CREATE INDEX IF NOT EXISTS idx_states_car_start
ON states (car_id, start_date);
"#,
)];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
    #[error("schema version {current} is outdated; expected {latest}")]
    OutdatedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

/// Opens the store for the query path; the API never writes.
pub fn open_read_only_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

pub fn ensure_supported_schema(connection: &Connection) -> Result<(), DbError> {
    let current = schema_version(connection)?;
    match current.cmp(&LATEST_SCHEMA_VERSION) {
        std::cmp::Ordering::Equal => Ok(()),
        std::cmp::Ordering::Greater => Err(DbError::UnsupportedSchemaVersion {
            current,
            latest: LATEST_SCHEMA_VERSION,
        }),
        std::cmp::Ordering::Less => Err(DbError::OutdatedSchemaVersion {
            current,
            latest: LATEST_SCHEMA_VERSION,
        }),
    }
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    parse_stored_timestamp(index, &raw)
}

fn optional_timestamp_column(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|raw| parse_stored_timestamp(index, &raw))
        .transpose()
}

fn parse_stored_timestamp(index: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

pub fn load_car_profile(connection: &Connection, car_id: i64) -> Result<Option<CarProfile>, DbError> {
    connection
        .query_row(
            "SELECT id, name, efficiency FROM cars WHERE id = ?1",
            params![car_id],
            |row| {
                Ok(CarProfile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    efficiency: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(DbError::from)
}

/// The first settings row; an empty table yields the defaults.
pub fn load_display_settings(connection: &Connection) -> Result<DisplaySettings, DbError> {
    let settings = connection
        .query_row(
            "SELECT unit_of_length, unit_of_temperature, preferred_range
             FROM settings
             ORDER BY id ASC
             LIMIT 1",
            [],
            |row| {
                let length: String = row.get(0)?;
                let temperature: String = row.get(1)?;
                let preferred_range: String = row.get(2)?;
                Ok(DisplaySettings {
                    unit_of_length: LengthUnit::from_db(&length),
                    unit_of_temperature: TemperatureUnit::from_db(&temperature),
                    preferred_range: PreferredRange::from_db(&preferred_range),
                })
            },
        )
        .optional()?;

    Ok(settings.unwrap_or_default())
}

fn range_columns(preferred_range: PreferredRange) -> (&'static str, &'static str) {
    match preferred_range {
        PreferredRange::Ideal => ("start_ideal_range_km", "end_ideal_range_km"),
        PreferredRange::Rated => ("start_rated_range_km", "end_rated_range_km"),
    }
}

/// All charging processes of a car, including one still in progress.
pub fn load_charge_events(
    connection: &Connection,
    car_id: i64,
    preferred_range: PreferredRange,
) -> Result<Vec<Event>, DbError> {
    let (start_range, end_range) = range_columns(preferred_range);
    let mut statement = connection.prepare(&format!(
        "SELECT c.start_date, c.end_date, c.{start_range}, c.{end_range},
                c.start_battery_level, c.end_battery_level,
                p.usable_battery_level, p.odometer, p.latitude, p.longitude
         FROM charging_processes c
         JOIN positions p ON c.position_id = p.id
         WHERE c.car_id = ?1
         ORDER BY c.start_date ASC, c.id ASC"
    ))?;

    let rows = statement.query_map(params![car_id], |row| {
        let end_time = optional_timestamp_column(row, 1)?;
        let end_range_km: Option<f64> = row.get(3)?;
        let end_battery_level: Option<i32> = row.get(5)?;

        Ok(Event::Charge(ChargeEvent {
            start_time: timestamp_column(row, 0)?,
            start_range_km: row.get(2)?,
            start_battery_level: row.get(4)?,
            usable_battery_level: row.get(6)?,
            odometer_km: row.get(7)?,
            position: Position {
                latitude: row.get(8)?,
                longitude: row.get(9)?,
            },
            end: end_time.zip(end_range_km).map(|(time, range_km)| ChargeEnd {
                time,
                range_km,
                battery_level: end_battery_level,
            }),
        }))
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }

    Ok(events)
}

/// Finished drives of a car; a drive in progress has no end position yet.
pub fn load_drive_events(
    connection: &Connection,
    car_id: i64,
    preferred_range: PreferredRange,
) -> Result<Vec<Event>, DbError> {
    let (start_range, end_range) = range_columns(preferred_range);
    let mut statement = connection.prepare(&format!(
        "SELECT d.start_date, d.end_date, d.{start_range}, d.{end_range},
                sp.battery_level, ep.battery_level,
                sp.usable_battery_level, ep.usable_battery_level,
                d.start_km, d.end_km, ep.latitude, ep.longitude
         FROM drives d
         JOIN positions sp ON d.start_position_id = sp.id
         JOIN positions ep ON d.end_position_id = ep.id
         WHERE d.car_id = ?1
           AND d.end_date IS NOT NULL
           AND d.{end_range} IS NOT NULL
           AND d.end_km IS NOT NULL
         ORDER BY d.start_date ASC, d.id ASC"
    ))?;

    let rows = statement.query_map(params![car_id], |row| {
        Ok(Event::Drive(DriveEvent {
            start_time: timestamp_column(row, 0)?,
            end_time: timestamp_column(row, 1)?,
            start_range_km: row.get(2)?,
            end_range_km: row.get(3)?,
            start_battery_level: row.get(4)?,
            end_battery_level: row.get(5)?,
            start_usable_battery_level: row.get(6)?,
            end_usable_battery_level: row.get(7)?,
            start_odometer_km: row.get(8)?,
            end_odometer_km: row.get(9)?,
            end_position: Position {
                latitude: row.get(10)?,
                longitude: row.get(11)?,
            },
        }))
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }

    Ok(events)
}

/// States overlapping `[from, until]`, ordered by start. Bounds are compared
/// as instants, so rows written with another RFC 3339 shape (an explicit
/// offset, no fraction) are matched too.
pub fn load_state_intervals(
    connection: &Connection,
    car_id: i64,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<StateInterval>, DbError> {
    let mut statement = connection.prepare(
        "SELECT state, start_date, end_date
         FROM states
         WHERE car_id = ?1
           AND julianday(start_date) < julianday(?3)
           AND (end_date IS NULL OR julianday(end_date) > julianday(?2))
         ORDER BY start_date ASC, id ASC",
    )?;

    let rows = statement.query_map(
        params![car_id, format_timestamp(from), format_timestamp(until)],
        |row| {
            let state: String = row.get(0)?;
            Ok(StateInterval {
                state: VehicleState::from_db(&state),
                start_time: timestamp_column(row, 1)?,
                end_time: optional_timestamp_column(row, 2)?,
            })
        },
    )?;

    let mut states = Vec::new();
    for row in rows {
        states.push(row?);
    }

    Ok(states)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceCounts {
    pub cars: i64,
    pub charging_processes: i64,
    pub drives: i64,
    pub states: i64,
}

pub fn count_source_rows(connection: &Connection) -> Result<SourceCounts, DbError> {
    let count = |table: &str| -> Result<i64, DbError> {
        let value = connection.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })?;
        Ok(value)
    };

    Ok(SourceCounts {
        cars: count("cars")?,
        charging_processes: count("charging_processes")?,
        drives: count("drives")?,
        states: count("states")?,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCarRecord {
    pub id: i64,
    pub name: Option<String>,
    pub efficiency: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPositionRecord {
    pub car_id: i64,
    pub date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub battery_level: Option<i32>,
    pub usable_battery_level: Option<i32>,
    pub odometer_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChargingProcessRecord {
    pub car_id: i64,
    pub position_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_ideal_range_km: f64,
    pub end_ideal_range_km: Option<f64>,
    pub start_rated_range_km: f64,
    pub end_rated_range_km: Option<f64>,
    pub start_battery_level: Option<i32>,
    pub end_battery_level: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDriveRecord {
    pub car_id: i64,
    pub start_position_id: i64,
    pub end_position_id: Option<i64>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub start_ideal_range_km: f64,
    pub end_ideal_range_km: Option<f64>,
    pub start_rated_range_km: f64,
    pub end_rated_range_km: Option<f64>,
    pub start_km: f64,
    pub end_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStateRecord {
    pub car_id: i64,
    pub state: VehicleState,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

// Writers below exist for fixture and demo databases only.

pub fn insert_car(connection: &Connection, car: &NewCarRecord) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO cars (id, name, efficiency) VALUES (?1, ?2, ?3)",
        params![car.id, car.name, car.efficiency],
    )?;
    Ok(())
}

pub fn insert_settings(connection: &Connection, settings: &DisplaySettings) -> Result<(), DbError> {
    connection.execute(
        "INSERT INTO settings (unit_of_length, unit_of_temperature, preferred_range) VALUES (?1, ?2, ?3)",
        params![
            settings.unit_of_length.as_str(),
            settings.unit_of_temperature.as_str(),
            settings.preferred_range.as_str(),
        ],
    )?;
    Ok(())
}

pub fn insert_position(
    connection: &Connection,
    position: &NewPositionRecord,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO positions (car_id, date, latitude, longitude, battery_level, usable_battery_level, odometer) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            position.car_id,
            format_timestamp(position.date),
            position.latitude,
            position.longitude,
            position.battery_level,
            position.usable_battery_level,
            position.odometer_km,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

pub fn insert_charging_process(
    connection: &Connection,
    charge: &NewChargingProcessRecord,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO charging_processes (car_id, position_id, start_date, end_date, start_ideal_range_km, end_ideal_range_km, start_rated_range_km, end_rated_range_km, start_battery_level, end_battery_level) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            charge.car_id,
            charge.position_id,
            format_timestamp(charge.start_date),
            charge.end_date.map(format_timestamp),
            charge.start_ideal_range_km,
            charge.end_ideal_range_km,
            charge.start_rated_range_km,
            charge.end_rated_range_km,
            charge.start_battery_level,
            charge.end_battery_level,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

pub fn insert_drive(connection: &Connection, drive: &NewDriveRecord) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO drives (car_id, start_position_id, end_position_id, start_date, end_date, start_ideal_range_km, end_ideal_range_km, start_rated_range_km, end_rated_range_km, start_km, end_km) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            drive.car_id,
            drive.start_position_id,
            drive.end_position_id,
            format_timestamp(drive.start_date),
            drive.end_date.map(format_timestamp),
            drive.start_ideal_range_km,
            drive.end_ideal_range_km,
            drive.start_rated_range_km,
            drive.end_rated_range_km,
            drive.start_km,
            drive.end_km,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

pub fn insert_state(connection: &Connection, state: &NewStateRecord) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO states (car_id, state, start_date, end_date) VALUES (?1, ?2, ?3, ?4)",
        params![
            state.car_id,
            state.state.as_str(),
            format_timestamp(state.start_date),
            state.end_date.map(format_timestamp),
        ],
    )?;

    Ok(connection.last_insert_rowid())
}
