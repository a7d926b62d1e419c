//! # rxtrack: shared async sources for reactive render loops
//!
//! Bridges futures and async sequences into a rendering pipeline: a sequence
//! consumed by many independent render sites is driven by exactly one
//! producer loop, observers attach and detach without disturbing producer
//! progress, and a late joiner is replayed the most recent value
//! synchronously.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::{cell::RefCell, rc::Rc};
//!
//! use futures::{executor::LocalPool, stream};
//! use rxtrack::prelude::*;
//!
//! let mut pool = LocalPool::new();
//! let cache = SequenceCache::new(pool.spawner());
//!
//! // One tracker per render site; values that arrive after `render` has
//! // returned flow through the notify channel.
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let tracker = Tracker::new(&cache, move |v| sink.borrow_mut().push(v));
//!
//! let ticks = SequenceSource::from_values(stream::iter([1, 2, 3]));
//! let first = tracker.render(AsyncSource::Sequence(ticks), None);
//! assert!(first.is_no_change());
//!
//! pool.run_until_stalled();
//! assert_eq!(*seen.borrow(), vec![Some(1), Some(2), Some(3)]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AsyncSource`] | A plain value, a single-resolution future, or a multi-value sequence |
//! | [`SequenceCache`] | One producer loop per live sequence, fan-out to every subscriber |
//! | [`Tracker`] | Per-render-site state machine with detach/reattach hooks |
//! | [`SyncBinding`] | Lifecycle-bound property sync (no producer sharing) |
//!
//! Everything runs on one single-threaded executor; nothing here is `Send`.
//! Source failures are reported through `tracing` and surface to observers
//! as a one-time `None` sentinel, never as a panic.
//!
//! [`AsyncSource`]: source::AsyncSource
//! [`SequenceCache`]: cache::SequenceCache
//! [`Tracker`]: tracker::Tracker
//! [`SyncBinding`]: sync::SyncBinding

pub mod cache;
pub mod error;
pub mod loading;
pub mod prelude;
pub mod rc;
pub mod source;
pub mod sync;
pub mod tracker;

// Re-export the prelude module
pub use prelude::*;
