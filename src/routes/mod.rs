pub mod auth;
pub mod devices;
pub mod health;
pub mod rate_limit;
pub mod sensors;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use rate_limit::ClientIpKeyExtractor;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::domain::{Device, SensorReading};
use crate::error::{json_error_envelope, AppError, AppResult, ErrorResponse};
use crate::repository::ItemFailure;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        devices::register_device,
        devices::list_devices,
        sensors::record_reading,
        sensors::record_bulk_readings,
        sensors::get_sensor_data,
    ),
    components(
        schemas(
            Device,
            SensorReading,
            ErrorResponse,
            ItemFailure,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "devices", description = "Device registry"),
        (name = "sensors", description = "Sensor telemetry ingestion and queries"),
    ),
    info(
        title = "Device Telemetry API",
        description = "Device registry and sensor telemetry ingestion API",
        version = "0.1.0"
    ),
    modifiers(&BearerAuth)
)]
struct ApiDoc;

struct BearerAuth;

impl utoipa::Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Build the application router.
///
/// # Errors
///
/// Returns `AppError::Internal` if the rate limiter configuration is invalid.
pub fn build_router(state: AppState) -> AppResult<Router> {
    let config = &state.config;

    // Base routes without rate limiting
    let data_routes_base = Router::new()
        .route("/devices", post(devices::register_device).get(devices::list_devices))
        .route("/devices/sensors", post(sensors::record_reading))
        .route("/devices/sensors/bulk", post(sensors::record_bulk_readings))
        .route(
            "/devices/{serial_number}/sensors",
            get(sensors::get_sensor_data),
        );

    let data_routes = if config.disable_rate_limiting {
        tracing::warn!("Rate limiting DISABLED");
        data_routes_base
    } else {
        tracing::info!(
            rate = %format!("{}/s burst {}", config.rate_limit_per_second, config.rate_limit_burst),
            "Rate limiting configured"
        );

        let limiter = GovernorConfigBuilder::default()
            .key_extractor(ClientIpKeyExtractor)
            .per_second(config.rate_limit_per_second)
            .burst_size(config.rate_limit_burst)
            .finish()
            .ok_or_else(|| AppError::Internal("Failed to create rate limiter".to_string()))?;

        data_routes_base.layer(GovernorLayer {
            config: Arc::new(limiter),
        })
    }
    .layer(RequestBodyLimitLayer::new(config.request_body_limit_bytes));

    // Health check (NO rate limiting)
    let mut api_routes = Router::new()
        .route("/hc", get(health::health_check))
        .merge(data_routes);

    if state.identity.is_some() {
        tracing::info!(
            public_paths = ?config.auth_public_paths,
            "Bearer token authentication enabled"
        );
        api_routes = api_routes.layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));
    } else {
        tracing::warn!("Authentication DISABLED: no identity service configured");
    }

    // Body-limit and rate-limit rejections carry plain text; give them the JSON body
    api_routes = api_routes.layer(middleware::map_response(json_error_envelope));

    if config.flat_error_status {
        tracing::info!("Legacy flat error status enabled");
        api_routes = api_routes.layer(middleware::map_response(auth::flatten_error_status));
    }

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    Ok(Router::new()
        .nest("/api/v1", api_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
