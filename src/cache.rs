//! Shared sequence cache.
//!
//! Many render sites may observe the same sequence. Instead of N competing
//! pull loops, the cache keeps exactly one producer loop per live sequence
//! and fans every produced value out to the current subscribers. A
//! subscriber arriving after values have flowed is replayed the most recent
//! one synchronously at subscribe time.
//!
//! Entry lifecycle is reference-counted by subscriber count: the entry is
//! created on first subscribe and removed eagerly when the last subscriber
//! leaves. An abandoned producer loop discovers the removal on its next
//! delivery — it re-looks its entry up by key and requires reference
//! identity, so a loop whose entry was removed (or removed and recreated)
//! retires without touching newer state and without delivering the value it
//! had in flight.

use std::{collections::HashMap, rc::Rc};

use futures::{
  task::{LocalFutureObj, LocalSpawn},
  Future,
};
use smallvec::SmallVec;

use crate::{
  rc::MutRc,
  source::{SequenceSource, SourceKey},
};

/// Callback registered against a sequence. Receives `Some(value)` per
/// produced value, or the `None` sentinel once if the producer fails.
pub type Subscriber<T> = Rc<dyn Fn(Option<T>)>;

type SubscriberSet<T> = SmallVec<[Subscriber<T>; 1]>;

pub(crate) struct CacheEntry<T> {
  last: Option<T>,
  subscribers: SubscriberSet<T>,
}

/// One producer per sequence, any number of observers.
///
/// Clones share the same entry map; a host creates one cache next to its
/// event loop and hands it to every [`Tracker`](crate::tracker::Tracker).
pub struct SequenceCache<T> {
  entries: MutRc<HashMap<SourceKey, MutRc<CacheEntry<T>>>>,
  spawner: Rc<dyn LocalSpawn>,
}

impl<T> Clone for SequenceCache<T> {
  fn clone(&self) -> Self {
    Self { entries: self.entries.clone(), spawner: self.spawner.clone() }
  }
}

impl<T> SequenceCache<T> {
  /// `spawner` is the host's single-threaded executor handle; producer
  /// loops run on it.
  pub fn new(spawner: impl LocalSpawn + 'static) -> Self {
    Self { entries: MutRc::own(HashMap::new()), spawner: Rc::new(spawner) }
  }

  pub(crate) fn spawner(&self) -> Rc<dyn LocalSpawn> { self.spawner.clone() }

  /// Number of sequences with at least one subscriber.
  pub fn len(&self) -> usize { self.entries.rc_deref().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Remove `subscriber` (by identity) from `source`'s entry. Removing the
  /// last subscriber deletes the entry; the producer loop notices and stops
  /// pulling, discarding any value already in flight.
  pub fn unsubscribe(&self, source: &SequenceSource<T>, subscriber: &Subscriber<T>) {
    let key = source.key();
    let Some(entry) = self.entries.rc_deref().get(&key).cloned() else { return };
    {
      let mut entry = entry.rc_deref_mut();
      entry.subscribers.retain(|s| !Rc::ptr_eq(s, subscriber));
      if !entry.subscribers.is_empty() {
        return;
      }
    }
    self.entries.rc_deref_mut().remove(&key);
  }
}

impl<T: Clone + 'static> SequenceCache<T> {
  /// Register `subscriber` against `source`, creating the entry and starting
  /// the producer loop if this is the first subscriber. If the entry already
  /// holds a value, `subscriber` is invoked with it before `subscribe`
  /// returns (late-joiner replay).
  pub fn subscribe(&self, source: &SequenceSource<T>, subscriber: Subscriber<T>) {
    let key = source.key();
    let existing = self.entries.rc_deref().get(&key).cloned();
    let entry = match existing {
      Some(entry) => entry,
      None => {
        let entry = MutRc::own(CacheEntry { last: None, subscribers: SmallVec::new() });
        self.entries.rc_deref_mut().insert(key, entry.clone());
        self.start_producer(source.clone(), entry.clone());
        entry
      }
    };

    entry.rc_deref_mut().subscribers.push(subscriber.clone());
    let replay = entry.rc_deref().last.clone();
    if let Some(value) = replay {
      subscriber(Some(value));
    }
  }

  fn start_producer(&self, source: SequenceSource<T>, entry: MutRc<CacheEntry<T>>) {
    let entries = self.entries.clone();
    spawn_local(&self.spawner, async move {
      loop {
        let pulled = source.pull().await;

        // The last subscriber may have left (and a newer entry may even
        // exist for the same sequence) while the pull was in flight. Only
        // the loop whose entry is still the mapped one may proceed.
        let live = entries
          .rc_deref()
          .get(&source.key())
          .is_some_and(|current| current.ptr_eq(&entry));
        if !live {
          break;
        }

        match pulled {
          None => break,
          Some(Ok(value)) => {
            // Snapshot before fanning out: a callback may subscribe or
            // unsubscribe reentrantly.
            let snapshot: SubscriberSet<T> = {
              let mut entry = entry.rc_deref_mut();
              entry.last = Some(value.clone());
              entry.subscribers.clone()
            };
            for subscriber in snapshot {
              subscriber(Some(value.clone()));
            }
          }
          Some(Err(err)) => {
            tracing::error!(error = %err, "shared sequence producer failed");
            // A failed entry cannot serve late joiners; remove it first so
            // a re-subscribe from inside the sentinel fan-out starts fresh.
            entries.rc_deref_mut().remove(&source.key());
            let snapshot = entry.rc_deref().subscribers.clone();
            for subscriber in snapshot {
              subscriber(None);
            }
            break;
          }
        }
      }
    });
  }
}

pub(crate) fn spawn_local(
  spawner: &Rc<dyn LocalSpawn>,
  task: impl Future<Output = ()> + 'static,
) {
  let task = LocalFutureObj::new(Box::new(task));
  if let Err(err) = spawner.spawn_local_obj(task) {
    tracing::error!(error = %err, "failed to spawn on the local executor");
  }
}
