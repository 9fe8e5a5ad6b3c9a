//! API constants

/// Versioned prefix for every API route.
pub const API_PREFIX: &str = "/api/v0";

pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";

/// Identity of the uploader, set by the upstream auth layer.
pub const UPLOADER_ID_HEADER: &str = "x-uploader-id";
pub const UPLOADER_ROLE_HEADER: &str = "x-uploader-role";

/// In-flight request cap when `HTTP_CONCURRENCY_LIMIT` is unset.
pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 10_000;
