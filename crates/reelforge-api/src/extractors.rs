//! Request extractors

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reelforge_core::{AppError, UploaderContext, UploaderRole};
use uuid::Uuid;

use crate::constants::{UPLOADER_ID_HEADER, UPLOADER_ROLE_HEADER};
use crate::error::HttpAppError;

/// Uploader identity taken from the `X-Uploader-Id` / `X-Uploader-Role` headers.
///
/// Authentication happens upstream; this only parses what it forwards.
#[derive(Debug, Clone, Copy)]
pub struct Uploader(pub UploaderContext);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AppError::InvalidRequest(format!("Missing {} header", name)))?
        .to_str()
        .map_err(|_| AppError::InvalidRequest(format!("Header {} is not valid ASCII", name)))
}

impl<S> FromRequestParts<S> for Uploader
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uploader_id = Uuid::parse_str(header(parts, UPLOADER_ID_HEADER)?.trim()).map_err(|_| {
            AppError::InvalidRequest(format!("{} must be a UUID", UPLOADER_ID_HEADER))
        })?;
        let role: UploaderRole = header(parts, UPLOADER_ROLE_HEADER)?
            .parse()
            .map_err(AppError::InvalidRequest)?;

        Ok(Uploader(UploaderContext { uploader_id, role }))
    }
}
