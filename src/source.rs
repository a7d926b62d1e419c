//! Async source classification.
//!
//! A render site can be fed a plain value, a single-resolution future, or a
//! multi-value sequence. The distinction is made exactly once, at the API
//! boundary, by constructing an [`AsyncSource`] variant; nothing downstream
//! probes capabilities at runtime.
//!
//! Sources are identity-comparable handles: cloning a [`FutureSource`] or
//! [`SequenceSource`] yields another handle to the same underlying producer,
//! and two independently constructed sources are never conflated even when
//! they produce identical values.

use std::{cell::RefCell, rc::Rc};

use futures::{
  future::{self, LocalBoxFuture, Shared},
  stream::LocalBoxStream,
  Future, FutureExt, Stream, StreamExt,
};

use crate::error::{BoxError, SourceError};

pub(crate) type SequenceItem<T> = Result<T, SourceError>;

type SharedResolve<T> = Shared<LocalBoxFuture<'static, Result<T, SourceError>>>;

// ============================================================================
// SourceKey
// ============================================================================

/// Map key derived from a sequence handle's allocation.
///
/// Stable for as long as any handle to the sequence is alive, which the
/// cache guarantees by keeping a handle inside every producer loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey(usize);

// ============================================================================
// SequenceSource
// ============================================================================

/// Identity-comparable handle to a multi-value async sequence.
///
/// The wrapped stream is stateful and shared: every pull, no matter which
/// handle issued it, advances the one underlying stream. A consumer that
/// starts pulling after others have consumed values resumes from the
/// sequence's current position, not from the beginning.
pub struct SequenceSource<T> {
  inner: Rc<RefCell<LocalBoxStream<'static, SequenceItem<T>>>>,
}

impl<T> Clone for SequenceSource<T> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<T> SequenceSource<T> {
  pub(crate) fn key(&self) -> SourceKey {
    SourceKey(Rc::as_ptr(&self.inner) as *const () as usize)
  }

  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.inner, &other.inner) }
}

impl<T: 'static> SequenceSource<T> {
  /// Wrap a fallible stream. Pull failures become [`SourceError::Producer`].
  pub fn new<S, E>(stream: S) -> Self
  where
    S: Stream<Item = Result<T, E>> + 'static,
    E: Into<BoxError>,
  {
    Self::from_items(stream.map(|item| item.map_err(|e| SourceError::producer(e))))
  }

  /// Wrap an infallible stream of values.
  pub fn from_values<S>(stream: S) -> Self
  where
    S: Stream<Item = T> + 'static,
  {
    Self::from_items(stream.map(Ok))
  }

  pub(crate) fn from_items<S>(stream: S) -> Self
  where
    S: Stream<Item = SequenceItem<T>> + 'static,
  {
    Self { inner: Rc::new(RefCell::new(stream.boxed_local())) }
  }

  /// Pull the next item. Resolves to `None` on completion.
  ///
  /// The stream is borrowed only inside `poll`, never across a suspension
  /// point, so concurrent pullers interleave instead of panicking.
  pub(crate) fn pull(&self) -> impl Future<Output = Option<SequenceItem<T>>> {
    let inner = self.inner.clone();
    future::poll_fn(move |cx| inner.borrow_mut().as_mut().poll_next(cx))
  }
}

// ============================================================================
// FutureSource
// ============================================================================

/// Identity-comparable handle to a single-resolution future.
///
/// The resolution is shared: any number of observers can await the same
/// handle and each receives a clone of the one resolved value. Rejections
/// become [`SourceError::Rejection`].
pub struct FutureSource<T> {
  token: Rc<()>,
  shared: SharedResolve<T>,
}

impl<T> Clone for FutureSource<T> {
  fn clone(&self) -> Self {
    Self { token: self.token.clone(), shared: self.shared.clone() }
  }
}

impl<T> FutureSource<T> {
  /// A clone of the shared resolution, awaitable independently per observer.
  pub(crate) fn resolved(&self) -> SharedResolve<T> { self.shared.clone() }

  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.token, &other.token) }
}

impl<T: Clone + 'static> FutureSource<T> {
  pub fn new<F, E>(future: F) -> Self
  where
    F: Future<Output = Result<T, E>> + 'static,
    E: Into<BoxError>,
  {
    let resolve = future
      .map(|result| result.map_err(|e| SourceError::rejection(e)))
      .boxed_local();
    Self { token: Rc::new(()), shared: resolve.shared() }
  }
}

// ============================================================================
// AsyncSource
// ============================================================================

/// A value a render site can track: already known, resolving once, or
/// produced repeatedly.
#[derive(Clone)]
pub enum AsyncSource<T> {
  Value(T),
  Future(FutureSource<T>),
  Sequence(SequenceSource<T>),
}

impl<T: Clone + 'static> AsyncSource<T> {
  pub fn value(value: T) -> Self { AsyncSource::Value(value) }

  pub fn future<F, E>(future: F) -> Self
  where
    F: Future<Output = Result<T, E>> + 'static,
    E: Into<BoxError>,
  {
    AsyncSource::Future(FutureSource::new(future))
  }

  pub fn sequence<S, E>(stream: S) -> Self
  where
    S: Stream<Item = Result<T, E>> + 'static,
    E: Into<BoxError>,
  {
    AsyncSource::Sequence(SequenceSource::new(stream))
  }

  pub fn from_values<S>(stream: S) -> Self
  where
    S: Stream<Item = T> + 'static,
  {
    AsyncSource::Sequence(SequenceSource::from_values(stream))
  }
}

impl<T: PartialEq> AsyncSource<T> {
  /// Is this the same source as `other`?
  ///
  /// Futures and sequences compare by handle identity; plain values, which
  /// have no object identity in Rust, compare by equality. Sources of
  /// different classes are always distinct.
  pub fn identity_eq(&self, other: &Self) -> bool {
    match (self, other) {
      (AsyncSource::Value(a), AsyncSource::Value(b)) => a == b,
      (AsyncSource::Future(a), AsyncSource::Future(b)) => a.ptr_eq(b),
      (AsyncSource::Sequence(a), AsyncSource::Sequence(b)) => a.ptr_eq(b),
      _ => false,
    }
  }
}

impl<T> From<FutureSource<T>> for AsyncSource<T> {
  fn from(source: FutureSource<T>) -> Self { AsyncSource::Future(source) }
}

impl<T> From<SequenceSource<T>> for AsyncSource<T> {
  fn from(source: SequenceSource<T>) -> Self { AsyncSource::Sequence(source) }
}

#[cfg(test)]
mod tests {
  use futures::{executor::block_on, stream};

  use super::*;

  #[test]
  fn sequence_clones_share_identity() {
    let a = SequenceSource::from_values(stream::iter([1, 2]));
    let b = a.clone();
    let c = SequenceSource::from_values(stream::iter([1, 2]));
    assert!(a.ptr_eq(&b));
    assert_eq!(a.key(), b.key());
    assert!(!a.ptr_eq(&c));
    assert_ne!(a.key(), c.key());
  }

  #[test]
  fn sequence_pull_advances_shared_state() {
    let a = SequenceSource::from_values(stream::iter([1, 2, 3]));
    let b = a.clone();
    assert_eq!(block_on(a.pull()).unwrap().unwrap(), 1);
    // The clone resumes where the first handle left off.
    assert_eq!(block_on(b.pull()).unwrap().unwrap(), 2);
    assert_eq!(block_on(a.pull()).unwrap().unwrap(), 3);
    assert!(block_on(a.pull()).is_none());
  }

  #[test]
  fn fallible_sequence_maps_to_producer_error() {
    let source = SequenceSource::new(stream::iter(vec![Ok(1), Err("boom")]));
    assert_eq!(block_on(source.pull()).unwrap().unwrap(), 1);
    let err = block_on(source.pull()).unwrap().unwrap_err();
    assert!(matches!(err, SourceError::Producer(_)));
  }

  #[test]
  fn future_source_resolves_for_every_observer() {
    let source = FutureSource::new(future::ready(Ok::<_, BoxError>(7)));
    let first = block_on(source.resolved());
    let second = block_on(source.clone().resolved());
    assert_eq!(first.unwrap(), 7);
    assert_eq!(second.unwrap(), 7);
  }

  #[test]
  fn identity_comparison_by_class() {
    let seq = SequenceSource::<i32>::from_values(stream::iter([1]));
    let fut = FutureSource::new(future::ready(Ok::<_, BoxError>(1)));

    let a = AsyncSource::Sequence(seq.clone());
    assert!(a.identity_eq(&AsyncSource::Sequence(seq)));
    assert!(!a.identity_eq(&AsyncSource::Future(fut.clone())));
    assert!(!a.identity_eq(&AsyncSource::Value(1)));

    let f = AsyncSource::Future(fut.clone());
    assert!(f.identity_eq(&AsyncSource::Future(fut)));

    assert!(AsyncSource::Value(5).identity_eq(&AsyncSource::Value(5)));
    assert!(!AsyncSource::Value(5).identity_eq(&AsyncSource::Value(6)));
  }
}
