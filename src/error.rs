//! Failure kinds reported by async sources.
//!
//! Source failures are non-fatal: they are reported through the `tracing`
//! side-channel and observers receive the `None` ("unresolved") sentinel
//! exactly once, after which the failed source delivers nothing further.
//! Nothing here ever propagates as a panic to a caller.

use std::rc::Rc;

use thiserror::Error;

/// Boxed error accepted at the crate boundary.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// A failure produced by an async source.
///
/// The payload is reference-counted so one failure can fan out to every
/// observer of a shared sequence without cloning the underlying error.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
  /// A sequence cursor's pull rejected.
  #[error("sequence producer failed: {0}")]
  Producer(Rc<dyn std::error::Error>),
  /// A single-resolution future settled with an error.
  #[error("future rejected: {0}")]
  Rejection(Rc<dyn std::error::Error>),
}

impl SourceError {
  pub fn producer(err: impl Into<BoxError>) -> Self {
    SourceError::Producer(Rc::from(err.into()))
  }

  pub fn rejection(err: impl Into<BoxError>) -> Self {
    SourceError::Rejection(Rc::from(err.into()))
  }
}
