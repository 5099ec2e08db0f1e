//! Runtime adapters for spawning background futures.

pub mod tokio_spawner;

pub use tokio_spawner::TokioSpawner;
