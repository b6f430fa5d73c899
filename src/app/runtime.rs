use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, http::Method, web};

use crate::adapters::api::{ApiState, configure_routes};
use crate::adapters::db::{ensure_supported_schema, open_read_only_connection, schema_version};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::services::SqliteParkingService;

pub fn run(config: AppConfig) -> Result<(), AppError> {
    let connection =
        open_read_only_connection(&config.db_path).map_err(AppError::database_init)?;
    ensure_supported_schema(&connection).map_err(AppError::database_init)?;
    let version = schema_version(&connection).map_err(AppError::database_init)?;
    tracing::info!(db_path = %config.db_path, schema_version = version, "telemetry database opened");

    let shared_connection = Arc::new(Mutex::new(connection));
    let api_state = ApiState {
        parking_queries: SqliteParkingService::new(
            Arc::clone(&shared_connection),
            config.derivation_settings(),
        ),
        display_offset: config.display_offset,
        default_page_size: config.default_page_size,
    };

    tracing::info!(bind = %config.http_bind, "http server starting");

    let result = actix_web::rt::System::new().block_on(async move {
        HttpServer::new(move || {
            App::new()
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allowed_methods(vec![Method::GET])
                        .allow_any_header()
                        .max_age(3600),
                )
                .app_data(web::Data::new(api_state.clone()))
                .configure(configure_routes)
        })
        .bind(&config.http_bind)?
        .run()
        .await
    });

    result.map_err(AppError::runtime)
}
