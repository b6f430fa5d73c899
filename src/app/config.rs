use chrono::{FixedOffset, Offset, Utc};

use crate::app::AppError;
use crate::domain::parking::DerivationSettings;
use crate::domain::validity::{
    DEFAULT_MAX_ODOMETER_DELTA_KM, DEFAULT_MIN_DURATION_SECONDS, ValidityThresholds,
};

pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub http_bind: String,
    pub min_parking_seconds: f64,
    pub max_parked_odometer_delta_km: f64,
    pub reduced_range_tolerance_pct: i32,
    pub default_page_size: u32,
    pub display_offset: FixedOffset,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(error) = dotenvy::dotenv()
            && !error.not_found()
        {
            return Err(AppError::config(format!("failed to read .env file: {error}")));
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let min_parking_seconds =
            parse_or_default(&lookup, "MIN_PARKING_SECONDS", DEFAULT_MIN_DURATION_SECONDS)?;
        if !min_parking_seconds.is_finite() || min_parking_seconds < 0.0 {
            return Err(AppError::config(
                "MIN_PARKING_SECONDS must be a non-negative number",
            ));
        }

        let max_parked_odometer_delta_km = parse_or_default(
            &lookup,
            "MAX_PARKED_ODOMETER_DELTA_KM",
            DEFAULT_MAX_ODOMETER_DELTA_KM,
        )?;
        if !max_parked_odometer_delta_km.is_finite() || max_parked_odometer_delta_km <= 0.0 {
            return Err(AppError::config(
                "MAX_PARKED_ODOMETER_DELTA_KM must be a positive number",
            ));
        }

        let reduced_range_tolerance_pct =
            parse_or_default(&lookup, "REDUCED_RANGE_TOLERANCE_PCT", 0_i32)?;
        if reduced_range_tolerance_pct < 0 {
            return Err(AppError::config(
                "REDUCED_RANGE_TOLERANCE_PCT must not be negative",
            ));
        }

        let default_page_size = parse_or_default(&lookup, "DEFAULT_PAGE_SIZE", 100_u32)?;
        if !(1..=MAX_PAGE_SIZE).contains(&default_page_size) {
            return Err(AppError::config(format!(
                "DEFAULT_PAGE_SIZE must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let display_offset = match non_empty(&lookup, "DISPLAY_UTC_OFFSET") {
            Some(raw) => raw.parse::<FixedOffset>().map_err(|_| {
                AppError::config("DISPLAY_UTC_OFFSET must look like +02:00 or -05:30")
            })?,
            None => Utc.fix(),
        };

        Ok(Self {
            db_path: non_empty(&lookup, "DB_PATH")
                .unwrap_or_else(|| "/var/lib/parkings/telemetry.db".to_string()),
            http_bind: non_empty(&lookup, "HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            min_parking_seconds,
            max_parked_odometer_delta_km,
            reduced_range_tolerance_pct,
            default_page_size,
            display_offset,
        })
    }

    pub fn derivation_settings(&self) -> DerivationSettings {
        DerivationSettings {
            thresholds: ValidityThresholds {
                min_duration_seconds: self.min_parking_seconds,
                max_odometer_delta_km: self.max_parked_odometer_delta_km,
            },
            reduced_range_tolerance_pct: self.reduced_range_tolerance_pct,
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}
