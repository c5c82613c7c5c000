//! Single-flight registry for per-photo background caching tasks.

mod task_registry;

pub use task_registry::{StartOutcome, TaskRegistry};
