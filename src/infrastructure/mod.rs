//! Infrastructure Layer
//!
//! Process lifecycle: shutdown signalling, request draining and ordered
//! startup/teardown of both listeners.

pub mod lifecycle;
pub mod shutdown;

pub use lifecycle::{BoundCoordinator, Coordinator, LifecycleHandle, LifecycleState, ServeSettings};
pub use shutdown::{shutdown_signal, RequestGuard, ShutdownController};
