/// Liveness probe
///
/// Always 200 while the process serves requests. Not rate-limited and
/// public unless removed from `AUTH_PUBLIC_PATHS`.
#[utoipa::path(
    get,
    path = "/api/v1/hc",
    responses(
        (status = 200, description = "Service is healthy", body = String),
    ),
    tag = "health"
)]
pub async fn health_check() -> &'static str {
    "Healthy"
}
