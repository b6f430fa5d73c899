use actix_web::{HttpResponse, Responder, get, web};
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone,
    Utc,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::config::MAX_PAGE_SIZE;
use crate::app::services::{
    ParkingQueryHandler, ParkingReport, ParkingRequest, ServiceError, SqliteParkingService,
};
use crate::domain::models::LengthUnit;
use crate::domain::pager::PageRequest;
use crate::domain::parking::{DateWindow, Parking};
use crate::domain::units::convert_km;

#[derive(Clone)]
pub struct ApiState {
    pub parking_queries: SqliteParkingService,
    pub display_offset: FixedOffset,
    pub default_page_size: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("car id must be a positive integer")]
    InvalidCarId(String),
    #[error("{name} must be an integer")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} is not a valid date")]
    InvalidDate { name: &'static str, value: String },
    #[error("startDate must not be after endDate")]
    InvertedWindow,
}

impl RequestError {
    fn details(&self) -> String {
        match self {
            Self::InvalidCarId(value) => format!("got '{value}'"),
            Self::InvalidNumber { value, .. } => format!("got '{value}'"),
            Self::InvalidDate { value, .. } => format!(
                "got '{value}', expected RFC 3339, YYYY-MM-DDTHH:MM:SS, YYYY-MM-DD HH:MM:SS or YYYY-MM-DD"
            ),
            Self::InvertedWindow => "the window would select nothing".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParkingsQuery {
    pub page: Option<String>,
    pub show: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CarResponse {
    pub car_id: i64,
    pub car_name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UnitsResponse {
    pub unit_of_length: String,
    pub unit_of_temperature: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ParkingResponse {
    pub start_date_ts: i64,
    pub end_date_ts: i64,
    pub start_date: String,
    pub end_date: String,
    pub duration: f64,
    pub standby: f64,
    pub standby_ratio: f64,
    pub soc_diff: i32,
    pub has_reduced_range: u8,
    pub range_diff: f64,
    pub consumption: f64,
    pub avg_power: f64,
    pub range_lost_per_hour: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ParkingsData {
    pub car: CarResponse,
    pub parkings: Vec<ParkingResponse>,
    pub units: UnitsResponse,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ParkingsResponse {
    pub data: ParkingsData,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsDbResponse {
    pub schema_version: u32,
    pub cars_count: i64,
    pub charging_processes_count: i64,
    pub drives_count: i64,
    pub states_count: i64,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(list_parkings_endpoint)
        .service(get_db_diagnostics_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/api/v1/cars/{car_id}/parkings")]
async fn list_parkings_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<String>,
    query: web::Query<ParkingsQuery>,
) -> impl Responder {
    let request = match parse_parkings_request(&path, &query, &state) {
        Ok(request) => request,
        Err(error) => return request_error_response(error),
    };

    match state.parking_queries.list_parkings(&request) {
        Ok(report) => HttpResponse::Ok().json(build_response(report, state.display_offset)),
        Err(error) => service_error_response(error),
    }
}

#[get("/diagnostics/db")]
async fn get_db_diagnostics_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let schema_version = match state.parking_queries.get_schema_version() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };
    let counts = match state.parking_queries.count_source_rows() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };

    HttpResponse::Ok().json(DiagnosticsDbResponse {
        schema_version,
        cars_count: counts.cars,
        charging_processes_count: counts.charging_processes,
        drives_count: counts.drives,
        states_count: counts.states,
    })
}

fn parse_parkings_request(
    car_id: &str,
    query: &ParkingsQuery,
    state: &ApiState,
) -> Result<ParkingRequest, RequestError> {
    let car_id = car_id
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| RequestError::InvalidCarId(car_id.to_string()))?;

    let page = parse_integer(query.page.as_deref(), "page")?
        .unwrap_or(1)
        .clamp(1, i64::from(u32::MAX));
    let show = parse_integer(query.show.as_deref(), "show")?
        .unwrap_or(i64::from(state.default_page_size))
        .clamp(1, i64::from(MAX_PAGE_SIZE));

    let from = query
        .start_date
        .as_deref()
        .map(|raw| parse_date_param(raw, "startDate", state.display_offset, DayBound::Start))
        .transpose()?;
    let until = query
        .end_date
        .as_deref()
        .map(|raw| parse_date_param(raw, "endDate", state.display_offset, DayBound::End))
        .transpose()?;

    if let (Some(from), Some(until)) = (from, until)
        && from > until
    {
        return Err(RequestError::InvertedWindow);
    }

    Ok(ParkingRequest {
        car_id,
        window: DateWindow { from, until },
        page: PageRequest::new(page as u32, show as u32),
    })
}

/// Non-numeric values are rejected; values below 1 are left for the caller
/// to clamp.
fn parse_integer(raw: Option<&str>, name: &'static str) -> Result<Option<i64>, RequestError> {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| RequestError::InvalidNumber {
            name,
            value: raw.to_string(),
        })
}

const LAST_MS_OF_DAY: i64 = 86_400_000 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayBound {
    Start,
    End,
}

/// Values without an offset are read in the display offset. A bare date
/// covers the whole day when used as an upper bound.
fn parse_date_param(
    raw: &str,
    name: &'static str,
    offset: FixedOffset,
    bound: DayBound,
) -> Result<DateTime<Utc>, RequestError> {
    let raw = raw.trim();
    let invalid = || RequestError::InvalidDate {
        name,
        value: raw.to_string(),
    };

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(value.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|date| match bound {
                DayBound::Start => date.and_time(NaiveTime::MIN),
                DayBound::End => date.and_time(NaiveTime::MIN) + Duration::milliseconds(LAST_MS_OF_DAY),
            })
        })
        .map_err(|_| invalid())?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|value| value.with_timezone(&Utc))
        .ok_or_else(invalid)
}

fn build_response(report: ParkingReport, offset: FixedOffset) -> ParkingsResponse {
    let unit = report.settings.unit_of_length;

    ParkingsResponse {
        data: ParkingsData {
            car: CarResponse {
                car_id: report.car.id,
                car_name: report.car.name,
            },
            parkings: report
                .parkings
                .iter()
                .map(|parking| parking_response(parking, unit, offset))
                .collect(),
            units: UnitsResponse {
                unit_of_length: unit.as_str().to_string(),
                unit_of_temperature: report.settings.unit_of_temperature.as_str().to_string(),
            },
        },
    }
}

fn parking_response(parking: &Parking, unit: LengthUnit, offset: FixedOffset) -> ParkingResponse {
    let interval = &parking.interval;
    let metrics = &parking.metrics;

    ParkingResponse {
        start_date_ts: interval.start_time.timestamp_millis(),
        end_date_ts: interval.end_time.timestamp_millis(),
        start_date: display_timestamp(interval.start_time, offset),
        end_date: display_timestamp(interval.end_time, offset),
        duration: parking.duration_seconds,
        standby: parking.standby_seconds,
        standby_ratio: parking.standby_ratio(),
        soc_diff: metrics.soc_diff,
        has_reduced_range: u8::from(interval.reduced_range),
        range_diff: convert_km(metrics.range_diff_km, unit),
        consumption: metrics.consumption_kwh,
        avg_power: metrics.avg_power_w,
        range_lost_per_hour: convert_km(metrics.range_lost_per_hour_km, unit),
        latitude: interval.position.latitude,
        longitude: interval.position.longitude,
    }
}

fn display_timestamp(value: DateTime<Utc>, offset: FixedOffset) -> String {
    value
        .with_timezone(&offset)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn request_error_response(error: RequestError) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": error.to_string(),
        "details": error.details(),
    }))
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::CarNotFound(car_id) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("car {car_id} not found")
        })),
        ServiceError::DbLockPoisoned => {
            tracing::warn!("database lock poisoned");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "database lock poisoned"
            }))
        }
        ServiceError::Database(error) => {
            tracing::warn!(error = %error, "database query failed");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("database query failed: {error}")
            }))
        }
    }
}


#[cfg(test)]
mod date_param_tests {
    use chrono::{Duration, FixedOffset, TimeZone, Utc};

    use super::{DayBound, RequestError, parse_date_param};

    #[test]
    fn parses_supported_date_formats() {
        let utc = FixedOffset::east_opt(0).expect("offset should be valid");
        let expected = Utc.with_ymd_and_hms(2026, 2, 20, 18, 0, 0).unwrap();

        for raw in [
            "2026-02-20T18:00:00Z",
            "2026-02-20T19:00:00+01:00",
            "2026-02-20T18:00:00",
            "2026-02-20 18:00:00",
        ] {
            assert_eq!(
                parse_date_param(raw, "startDate", utc, DayBound::Start),
                Ok(expected),
                "{raw}"
            );
        }
    }

    #[test]
    fn bare_dates_cover_the_whole_day_in_display_offset() {
        let plus_two = FixedOffset::east_opt(2 * 3600).expect("offset should be valid");

        let start = parse_date_param("2026-02-20", "startDate", plus_two, DayBound::Start);
        let end = parse_date_param("2026-02-20", "endDate", plus_two, DayBound::End);

        assert_eq!(start, Ok(Utc.with_ymd_and_hms(2026, 2, 19, 22, 0, 0).unwrap()));
        assert_eq!(
            end,
            Ok(Utc.with_ymd_and_hms(2026, 2, 20, 21, 59, 59).unwrap()
                + Duration::milliseconds(999))
        );
    }

    #[test]
    fn rejects_unknown_date_formats() {
        let utc = FixedOffset::east_opt(0).expect("offset should be valid");

        assert!(matches!(
            parse_date_param("yesterday", "endDate", utc, DayBound::End),
            Err(RequestError::InvalidDate { name: "endDate", .. })
        ));
    }
}
