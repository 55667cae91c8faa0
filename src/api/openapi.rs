//! OpenAPI documentation and schema generation
//!
//! The specification is generated at compile time by utoipa and served at
//! `/openapi.json` (and through Swagger UI at `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the xhs-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "xhs-dl REST API",
        version = "0.1.0",
        description = "Submit batch media downloads for publisher, liked and saved listings and follow their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5556", description = "Local development server")
    ),
    paths(
        // Batch Tasks
        crate::api::routes::download_user_posted,
        crate::api::routes::download_liked_videos,
        crate::api::routes::download_saved_videos,
        crate::api::routes::list_tasks,
        crate::api::routes::get_task,
        crate::api::routes::cancel_task,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        crate::types::TaskId,
        crate::types::ListingMode,
        crate::types::TaskStatus,
        crate::types::Statistics,
        crate::types::Task,
        crate::types::BatchRequest,
        crate::types::Event,
        crate::api::routes::TaskCreatedResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Batch tasks - Submit listing downloads, poll and cancel them"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` header scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
