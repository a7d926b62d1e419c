//! Integration tests over the public API.
//!
//! Exercises the end-to-end scenarios: several render sites sharing one
//! sequence, failure reporting, detach/reattach replay and the loading
//! wrapper feeding a tracker.

use std::{
  cell::{Cell, RefCell},
  rc::Rc,
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
};

use futures::{channel::mpsc, executor::LocalPool, future, stream};
use rxtrack::prelude::*;

fn site<T: Clone + 'static>(
  cache: &SequenceCache<T>,
) -> (Tracker<T>, Rc<RefCell<Vec<Option<T>>>>) {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let sink = seen.clone();
  (Tracker::new(cache, move |v| sink.borrow_mut().push(v)), seen)
}

/// Minimal subscriber that counts ERROR events, nothing else.
struct ErrorCount(Arc<AtomicUsize>);

impl tracing::Subscriber for ErrorCount {
  fn enabled(&self, metadata: &tracing::Metadata<'_>) -> bool {
    *metadata.level() == tracing::Level::ERROR
  }

  fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
    tracing::span::Id::from_u64(1)
  }

  fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

  fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

  fn event(&self, _: &tracing::Event<'_>) { self.0.fetch_add(1, Ordering::Relaxed); }

  fn enter(&self, _: &tracing::span::Id) {}

  fn exit(&self, _: &tracing::span::Id) {}
}

#[test]
fn two_sites_share_one_producer() {
  let mut pool = LocalPool::new();
  let cache = SequenceCache::new(pool.spawner());

  let pulls = Rc::new(Cell::new(0));
  let counter = pulls.clone();
  let ticks = stream::unfold(0, move |n| {
    counter.set(counter.get() + 1);
    async move { if n < 3 { Some((n + 1, n + 1)) } else { None } }
  });
  let source = SequenceSource::from_values(ticks);

  let (a, seen_a) = site(&cache);
  let (b, seen_b) = site(&cache);
  assert!(a.render(AsyncSource::Sequence(source.clone()), None).is_no_change());
  assert!(b.render(AsyncSource::Sequence(source), None).is_no_change());

  pool.run_until_stalled();
  assert_eq!(*seen_a.borrow(), vec![Some(1), Some(2), Some(3)]);
  assert_eq!(*seen_b.borrow(), vec![Some(1), Some(2), Some(3)]);
  // One upstream pull stream regardless of the observer count: three values
  // plus the final pull that observed completion.
  assert_eq!(pulls.get(), 4);

  // Completion is quiet: nothing further arrives on either channel.
  pool.run_until_stalled();
  assert_eq!(seen_a.borrow().len(), 3);
  assert_eq!(seen_b.borrow().len(), 3);
}

#[test]
fn rejected_future_reports_once_and_delivers_sentinel_once() {
  let errors = Arc::new(AtomicUsize::new(0));
  let seen = Rc::new(RefCell::new(Vec::new()));

  tracing::subscriber::with_default(ErrorCount(errors.clone()), || {
    let mut pool = LocalPool::new();
    let cache = SequenceCache::new(pool.spawner());
    let sink = seen.clone();
    let tracker = Tracker::new(&cache, move |v: Option<i32>| sink.borrow_mut().push(v));

    let source = AsyncSource::future(future::ready(Err::<i32, _>("x")));
    assert!(tracker.render(source, None).is_no_change());
    pool.run_until_stalled();
    pool.run_until_stalled();
  });

  assert_eq!(*seen.borrow(), vec![None]);
  assert_eq!(errors.load(Ordering::Relaxed), 1);
}

#[test]
fn failing_shared_sequence_reports_once_for_all_sites() {
  let errors = Arc::new(AtomicUsize::new(0));
  let seen_a = Rc::new(RefCell::new(Vec::new()));
  let seen_b = Rc::new(RefCell::new(Vec::new()));

  tracing::subscriber::with_default(ErrorCount(errors.clone()), || {
    let mut pool = LocalPool::new();
    let cache = SequenceCache::new(pool.spawner());
    let (a, b) = (seen_a.clone(), seen_b.clone());
    let first = Tracker::new(&cache, move |v: Option<i32>| a.borrow_mut().push(v));
    let second = Tracker::new(&cache, move |v: Option<i32>| b.borrow_mut().push(v));

    let source = SequenceSource::new(stream::iter(vec![Ok(1), Err("boom")]));
    first.render(AsyncSource::Sequence(source.clone()), None);
    second.render(AsyncSource::Sequence(source), None);
    pool.run_until_stalled();
  });

  // Every current subscriber receives the sentinel exactly once; the
  // failure itself is reported once, not once per observer.
  assert_eq!(*seen_a.borrow(), vec![Some(1), None]);
  assert_eq!(*seen_b.borrow(), vec![Some(1), None]);
  assert_eq!(errors.load(Ordering::Relaxed), 1);
}

#[test]
fn detached_site_reattaches_to_the_latest_value() {
  let mut pool = LocalPool::new();
  let cache = SequenceCache::new(pool.spawner());
  let (tx, rx) = mpsc::unbounded();
  let source = SequenceSource::from_values(rx);

  let (lamp, seen) = site(&cache);
  let (keeper, _seen_keeper) = site(&cache);
  lamp.render(AsyncSource::Sequence(source.clone()), None);
  keeper.render(AsyncSource::Sequence(source), None);

  tx.unbounded_send("green").unwrap();
  pool.run_until_stalled();
  assert_eq!(*seen.borrow(), vec![Some("green")]);

  lamp.on_detach();
  pool.run_until_stalled();

  // Reattach replays "green" synchronously, before any new value arrives.
  lamp.on_reattach();
  assert_eq!(*seen.borrow(), vec![Some("green"), Some("green")]);

  tx.unbounded_send("red").unwrap();
  pool.run_until_stalled();
  assert_eq!(*seen.borrow(), vec![Some("green"), Some("green"), Some("red")]);
}

#[test]
fn loading_wrapper_feeds_a_tracker() {
  let mut pool = LocalPool::new();
  let cache = SequenceCache::new(pool.spawner());
  let (tracker, seen) = site(&cache);

  let slow = AsyncSource::future(future::ready(Ok::<_, BoxError>("data")));
  let wrapped = loading(slow, "loading...");
  tracker.render(AsyncSource::Sequence(wrapped), None);
  pool.run_until_stalled();

  assert_eq!(*seen.borrow(), vec![Some("loading..."), Some("data")]);
}

#[test]
fn plain_value_involves_no_machinery() {
  let pool = LocalPool::new();
  let cache = SequenceCache::new(pool.spawner());
  let (tracker, seen) = site(&cache);

  let out = tracker.render(AsyncSource::Value(5), Some(Rc::new(|v: i32| v + 1)));
  assert_eq!(out, Rendered::Value(Some(6)));
  assert!(cache.is_empty());
  assert!(seen.borrow().is_empty());
}
