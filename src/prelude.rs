//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types for easy access.

pub use crate::cache::{SequenceCache, Subscriber};
pub use crate::error::{BoxError, SourceError};
pub use crate::loading::loading;
pub use crate::source::{AsyncSource, FutureSource, SequenceSource};
pub use crate::sync::SyncBinding;
pub use crate::tracker::{Notify, Rendered, Tracker, Transform};
