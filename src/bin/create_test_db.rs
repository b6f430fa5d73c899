use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rusqlite::Connection;
use vehicle_parkings::adapters::db::{
    DbError, NewCarRecord, NewChargingProcessRecord, NewDriveRecord, NewPositionRecord,
    NewStateRecord, insert_car, insert_charging_process, insert_drive, insert_position,
    insert_settings, insert_state, open_connection, run_migrations, schema_version,
};
use vehicle_parkings::domain::models::{DisplaySettings, VehicleState};

const DEMO_CAR_ID: i64 = 1;
const DEMO_DAYS: i64 = 14;

fn main() {
    if let Err(error) = run() {
        eprintln!("failed to create test db: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut path = if cfg!(windows) {
        ".\\data\\parkings_test.db".to_string()
    } else {
        "./data/parkings_test.db".to_string()
    };
    let mut force = false;
    let mut demo = false;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--path" => {
                let Some(value) = args.get(index + 1) else {
                    return Err("--path requires a value".to_string());
                };
                path = value.clone();
                index += 2;
            }
            "--force" => {
                force = true;
                index += 1;
            }
            "--demo" => {
                demo = true;
                index += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}"));
            }
        }
    }

    let path_ref = Path::new(&path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|error| format!("failed to create parent directory: {error}"))?;
    }

    if force && path_ref.exists() {
        std::fs::remove_file(path_ref)
            .map_err(|error| format!("failed to remove existing db file: {error}"))?;
    }

    let mut connection = open_connection(&path).map_err(|error| error.to_string())?;
    run_migrations(&mut connection).map_err(|error| error.to_string())?;
    let version = schema_version(&connection).map_err(|error| error.to_string())?;

    if demo {
        seed_demo_timeline(&connection).map_err(|error| error.to_string())?;
        println!("seeded {DEMO_DAYS} days of demo data for car {DEMO_CAR_ID}");
    }

    println!("created/updated test db at: {path}");
    println!("schema version: {version}");
    Ok(())
}

/// Commute to work in the morning, home in the evening, charge overnight.
/// The car sleeps through most of each stop.
fn seed_demo_timeline(connection: &Connection) -> Result<(), DbError> {
    insert_car(
        connection,
        &NewCarRecord {
            id: DEMO_CAR_ID,
            name: Some("Demo".to_string()),
            efficiency: Some(0.153),
        },
    )?;
    insert_settings(connection, &DisplaySettings::default())?;

    let home = (52.520_008, 13.404_954);
    let work = (52.507_1, 13.376_3);
    let first_day = Utc
        .with_ymd_and_hms(2026, 1, 5, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let mut odometer = 12_000.0;
    let mut range = 380.0;
    let mut level = 80;

    for day in 0..DEMO_DAYS {
        let midnight = first_day + Duration::days(day);

        let to_work_end = midnight + Duration::hours(8);
        let at_work = midnight + Duration::hours(17);
        seed_drive(
            connection,
            (midnight + Duration::minutes(7 * 60 + 35), to_work_end),
            (home, work),
            (&mut odometer, &mut range, &mut level),
            18.0,
        )?;
        seed_state(connection, to_work_end + Duration::minutes(15), at_work)?;
        // parked cars slowly lose range
        range -= 2.0;

        let home_at = midnight + Duration::minutes(17 * 60 + 40);
        seed_drive(
            connection,
            (at_work, home_at),
            (work, home),
            (&mut odometer, &mut range, &mut level),
            18.0,
        )?;

        let charge_start = midnight + Duration::hours(22);
        seed_state(connection, home_at + Duration::minutes(10), charge_start)?;
        range -= 1.5;

        let position_id = position(connection, charge_start, home, odometer, level)?;
        insert_charging_process(
            connection,
            &NewChargingProcessRecord {
                car_id: DEMO_CAR_ID,
                position_id,
                start_date: charge_start,
                end_date: Some(charge_start + Duration::hours(3)),
                start_ideal_range_km: range + 12.0,
                end_ideal_range_km: Some(392.0),
                start_rated_range_km: range,
                end_rated_range_km: Some(380.0),
                start_battery_level: Some(level),
                end_battery_level: Some(80),
            },
        )?;
        range = 380.0;
        level = 80;
    }

    Ok(())
}

fn seed_drive(
    connection: &Connection,
    (start, end): (DateTime<Utc>, DateTime<Utc>),
    (from, to): ((f64, f64), (f64, f64)),
    (odometer, range, level): (&mut f64, &mut f64, &mut i32),
    distance_km: f64,
) -> Result<(), DbError> {
    let start_position_id = position(connection, start, from, *odometer, *level)?;
    let start_km = *odometer;
    let start_range = *range;

    *odometer += distance_km;
    *range -= distance_km * 1.2;
    *level -= 5;

    let end_position_id = position(connection, end, to, *odometer, *level)?;
    insert_drive(
        connection,
        &NewDriveRecord {
            car_id: DEMO_CAR_ID,
            start_position_id,
            end_position_id: Some(end_position_id),
            start_date: start,
            end_date: Some(end),
            start_ideal_range_km: start_range + 12.0,
            end_ideal_range_km: Some(*range + 12.0),
            start_rated_range_km: start_range,
            end_rated_range_km: Some(*range),
            start_km,
            end_km: Some(*odometer),
        },
    )?;

    Ok(())
}

fn position(
    connection: &Connection,
    date: DateTime<Utc>,
    (latitude, longitude): (f64, f64),
    odometer_km: f64,
    level: i32,
) -> Result<i64, DbError> {
    insert_position(
        connection,
        &NewPositionRecord {
            car_id: DEMO_CAR_ID,
            date,
            latitude,
            longitude,
            battery_level: Some(level),
            usable_battery_level: Some(level),
            odometer_km,
        },
    )
}

fn seed_state(
    connection: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), DbError> {
    insert_state(
        connection,
        &NewStateRecord {
            car_id: DEMO_CAR_ID,
            state: VehicleState::Asleep,
            start_date: start,
            end_date: Some(end),
        },
    )?;
    Ok(())
}

fn print_help() {
    println!("create_test_db");
    println!();
    println!("Usage:");
    println!("  cargo run --bin create_test_db -- [--path <file>] [--force] [--demo]");
    println!();
    println!("Options:");
    println!(
        "  --path <file>   target sqlite file (default: .\\\\data\\\\parkings_test.db on Windows)"
    );
    println!("  --force         delete existing file before creating");
    println!("  --demo          seed two weeks of drives, charges and sleep states");
}
