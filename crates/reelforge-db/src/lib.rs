//! Reelforge DB Library
//!
//! Persistence for media artifacts. The pipeline only ever talks to the
//! `ArtifactRepository` trait; `PgArtifactRepository` backs it with Postgres and
//! `InMemoryArtifactRepository` is used when no database is configured and in tests.

pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use memory::InMemoryArtifactRepository;
pub use pool::setup_database;
pub use postgres::PgArtifactRepository;
pub use repository::ArtifactRepository;
