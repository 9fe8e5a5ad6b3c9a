use uuid::Uuid;

/// Destination for artifacts that are ready to be processed.
///
/// `submit` must not block and must not fail the caller: the upload has already
/// succeeded by the time it is called. Implementations report their own failures.
pub trait ProcessingHandoff: Send + Sync {
    fn submit(&self, media_id: Uuid);
}
