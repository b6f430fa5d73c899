pub mod config;
mod error;
mod logging;
mod runtime;
pub mod services;

pub use error::AppError;

pub fn run() -> Result<(), AppError> {
    logging::init()?;

    let config = config::AppConfig::from_env()?;

    tracing::info!(
        db_path = %config.db_path,
        http_bind = %config.http_bind,
        min_parking_seconds = config.min_parking_seconds,
        max_parked_odometer_delta_km = config.max_parked_odometer_delta_km,
        reduced_range_tolerance_pct = config.reduced_range_tolerance_pct,
        default_page_size = config.default_page_size,
        display_offset = %config.display_offset,
        "application bootstrap initialized"
    );

    runtime::run(config)
}
