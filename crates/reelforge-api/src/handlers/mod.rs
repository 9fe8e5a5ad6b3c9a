pub mod chunked_upload;
pub mod health;
pub mod media_status;
