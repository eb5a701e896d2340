use axum::{
    http::{HeaderValue, header},
    response::IntoResponse,
};

/// Returns the `OpenAPI` specification in YAML format.
pub async fn openapi_yaml() -> impl IntoResponse {
    let spec = include_str!("../../openapi.yaml");
    let version = env!("CARGO_PKG_VERSION");
    let spec_with_version = spec.replace("version: 0.0.0", &format!("version: {version}"));

    ([(header::CONTENT_TYPE, HeaderValue::from_static("text/yaml"))], spec_with_version)
}
