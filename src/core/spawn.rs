//! Runtime seam for spawning background futures.

use std::future::Future;

/// Abstraction for spawning task execution on a runtime.
///
/// Admission components use this for every background future they create:
/// window-decay timers, tick loops, and dispatched actions. Implementations
/// must not block; the spawned future is expected to run to completion in
/// the background.
pub trait Spawn {
    /// Spawn an async task that runs in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}
