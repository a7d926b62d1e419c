//! Declarative property sync bound to a host component lifecycle.
//!
//! A [`SyncBinding`] drives one async source into a host-owned property
//! slot: every resolved value is written through the `write` hook and
//! followed by an `update` notification so the host schedules a repaint.
//! The source is produced by a factory invoked on every attach, so a
//! detach/reattach cycle starts a fresh drive.
//!
//! Deliberately independent of [`SequenceCache`](crate::cache::SequenceCache):
//! two bindings observing the same sequence compete for its values rather
//! than sharing one producer. Sites that want sharing use a
//! [`Tracker`](crate::tracker::Tracker).

use std::rc::Rc;

use futures::task::LocalSpawn;

use crate::{cache::spawn_local, rc::MutRc, source::AsyncSource};

pub struct SyncBinding<T> {
  spawner: Rc<dyn LocalSpawn>,
  factory: Rc<dyn Fn() -> AsyncSource<T>>,
  write: Rc<dyn Fn(T)>,
  update: Rc<dyn Fn()>,
  /// Bumped on every connect/disconnect; an in-flight drive that observes a
  /// newer generation drops its delivery instead of applying it.
  generation: MutRc<u64>,
}

impl<T: Clone + 'static> SyncBinding<T> {
  pub fn new(
    spawner: impl LocalSpawn + 'static,
    factory: impl Fn() -> AsyncSource<T> + 'static,
    write: impl Fn(T) + 'static,
    update: impl Fn() + 'static,
  ) -> Self {
    Self {
      spawner: Rc::new(spawner),
      factory: Rc::new(factory),
      write: Rc::new(write),
      update: Rc::new(update),
      generation: MutRc::own(0),
    }
  }

  /// The host entered the tree: invalidate any previous drive, invoke the
  /// factory and start syncing its source into the property slot.
  pub fn host_connected(&self) {
    let generation = {
      let mut current = self.generation.rc_deref_mut();
      *current += 1;
      *current
    };

    match (self.factory)() {
      AsyncSource::Value(value) => {
        (self.write)(value);
        (self.update)();
      }
      AsyncSource::Future(fut) => {
        let resolved = fut.resolved();
        let write = self.write.clone();
        let update = self.update.clone();
        let current = self.generation.clone();
        spawn_local(&self.spawner, async move {
          let result = resolved.await;
          if *current.rc_deref() != generation {
            return;
          }
          match result {
            Ok(value) => {
              write(value);
              update();
            }
            Err(err) => tracing::error!(error = %err, "property sync future rejected"),
          }
        });
      }
      AsyncSource::Sequence(seq) => {
        let write = self.write.clone();
        let update = self.update.clone();
        let current = self.generation.clone();
        spawn_local(&self.spawner, async move {
          while let Some(item) = seq.pull().await {
            if *current.rc_deref() != generation {
              break;
            }
            match item {
              Ok(value) => {
                write(value);
                update();
              }
              Err(err) => {
                tracing::error!(error = %err, "property sync sequence failed");
                break;
              }
            }
          }
        });
      }
    }
  }

  /// The host left the tree: stop applying deliveries.
  pub fn host_disconnected(&self) { *self.generation.rc_deref_mut() += 1; }
}
