//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "OFS API",
        version = "0.1.0",
        description = "Image persistence service. `/save` accepts a base64 data URI or an http(s) URL, stores the image in primary storage and queues a dated archive copy."
    ),
    paths(
        handlers::save::save,
        handlers::archive_stats::archive_stats,
    ),
    components(
        schemas(
            handlers::save::SaveRequest,
            handlers::archive_stats::ArchiveStatsResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "files", description = "Image persistence"),
        (name = "archive", description = "Archive queue observability")
    )
)]
pub struct ApiDoc;
