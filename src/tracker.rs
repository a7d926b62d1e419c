//! Per-render-site tracking of an async source.
//!
//! A [`Tracker`] is long-lived: the host rendering engine calls
//! [`Tracker::render`] on every render pass, with the same or a different
//! source each time. Values that arrive after `render` has returned flow
//! through the notify channel the host registered at construction; the host
//! decides when to commit them.

use std::rc::Rc;

use crate::{
  cache::{spawn_local, SequenceCache, Subscriber},
  rc::MutRc,
  source::{AsyncSource, FutureSource, SequenceSource},
};

/// Optional mapping applied to each produced value before it is handed to
/// the renderer. Absent means identity.
pub type Transform<T> = Rc<dyn Fn(T) -> T>;

/// Out-of-band channel to the host: receives `Some(value)` per resolved
/// delivery, or `None` when a source failed ("unresolved").
pub type Notify<T> = Rc<dyn Fn(Option<T>)>;

/// What a `render` call hands back to the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
  /// A render-applicable value; `None` is the unresolved sentinel.
  Value(Option<T>),
  /// Nothing to commit from this call. Async deliveries, if any, will
  /// arrive through the notify channel.
  NoChange,
}

impl<T> Rendered<T> {
  pub fn is_no_change(&self) -> bool { matches!(self, Rendered::NoChange) }

  pub fn into_value(self) -> Option<Option<T>> {
    match self {
      Rendered::Value(value) => Some(value),
      Rendered::NoChange => None,
    }
  }
}

struct TrackerState<T> {
  source: Option<AsyncSource<T>>,
  transform: Option<Transform<T>>,
  /// Callback registered with the cache; `Some` exactly while the current
  /// source is a sequence (attached or not — detaching keeps it around so
  /// reattach re-registers the same one).
  subscriber: Option<Subscriber<T>>,
  /// Last value handed (or ready to hand) to the renderer.
  pending: Option<Option<T>>,
  attached: bool,
}

/// Tracking state for one observation site.
///
/// Dropping a tracker releases its cache subscription.
pub struct Tracker<T> {
  cache: SequenceCache<T>,
  spawner: Rc<dyn futures::task::LocalSpawn>,
  notify: Notify<T>,
  state: MutRc<TrackerState<T>>,
}

impl<T: Clone + 'static> Tracker<T> {
  /// `notify` is the host's async-notify channel; the tracker pushes every
  /// out-of-band update through it.
  pub fn new(cache: &SequenceCache<T>, notify: impl Fn(Option<T>) + 'static) -> Self {
    Tracker {
      cache: cache.clone(),
      spawner: cache.spawner(),
      notify: Rc::new(notify),
      state: MutRc::own(TrackerState {
        source: None,
        transform: None,
        subscriber: None,
        pending: None,
        attached: true,
      }),
    }
  }

  fn await_future(&self, source: FutureSource<T>) {
    let resolved = source.resolved();
    let state = self.state.clone();
    let notify = self.notify.clone();
    spawn_local(&self.spawner, async move {
      let result = resolved.await;
      // The site may have been handed a different source since; this
      // resolution then belongs to a superseded render and is dropped.
      let live = state.rc_deref().source.as_ref().is_some_and(
        |current| matches!(current, AsyncSource::Future(f) if f.ptr_eq(&source)),
      );
      if !live {
        return;
      }
      match result {
        Ok(value) => {
          let transform = state.rc_deref().transform.clone();
          push(&state, &notify, Some(apply(&transform, value)));
        }
        Err(err) => {
          tracing::error!(error = %err, "tracked future rejected");
          push(&state, &notify, None);
        }
      }
    });
  }

  fn subscribe_sequence(&self, source: SequenceSource<T>) {
    let subscriber: Subscriber<T> = {
      let state = self.state.clone();
      let notify = self.notify.clone();
      let sequence = source.clone();
      Rc::new(move |delivered: Option<T>| {
        let transform = {
          let st = state.rc_deref();
          let live = st.source.as_ref().is_some_and(
            |current| matches!(current, AsyncSource::Sequence(s) if s.ptr_eq(&sequence)),
          );
          if !live {
            return;
          }
          st.transform.clone()
        };
        let value = delivered.map(|v| apply(&transform, v));
        push(&state, &notify, value);
      })
    };
    let attached = {
      let mut st = self.state.rc_deref_mut();
      st.subscriber = Some(subscriber.clone());
      st.attached
    };
    // While detached, cache registration waits for `on_reattach`.
    if attached {
      self.cache.subscribe(&source, subscriber);
    }
  }

  /// Re-enter the active tree. For a sequence this re-registers the same
  /// callback, which replays the cache's last value synchronously; for a
  /// future, a value that resolved while detached is re-pushed now.
  pub fn on_reattach(&self) {
    enum Resume<T> {
      Sequence(SequenceSource<T>, Subscriber<T>),
      Replay(Option<T>),
      Nothing,
    }

    let resume = {
      let mut st = self.state.rc_deref_mut();
      if st.attached {
        return;
      }
      st.attached = true;
      match (&st.source, &st.subscriber) {
        (Some(AsyncSource::Sequence(s)), Some(subscriber)) => {
          Resume::Sequence(s.clone(), subscriber.clone())
        }
        (Some(AsyncSource::Future(_)), _) => match st.pending.clone() {
          Some(value) => Resume::Replay(value),
          None => Resume::Nothing,
        },
        _ => Resume::Nothing,
      }
    };

    match resume {
      Resume::Sequence(sequence, subscriber) => {
        self.cache.subscribe(&sequence, subscriber);
      }
      Resume::Replay(value) => (self.notify)(value),
      Resume::Nothing => {}
    }
  }
}

impl<T: Clone + PartialEq + 'static> Tracker<T> {
  /// Track `source`, returning a value to commit or [`Rendered::NoChange`].
  ///
  /// Idempotent for an unchanged source: repeated calls return the stored
  /// render value (or `NoChange` while nothing has resolved) without
  /// re-registering anything. A replaced `transform` on an unchanged async
  /// source applies to the next delivery only — already-delivered history is
  /// never rerun through it. Plain values recompute immediately.
  pub fn render(&self, source: AsyncSource<T>, transform: Option<Transform<T>>) -> Rendered<T> {
    let unchanged = self
      .state
      .rc_deref()
      .source
      .as_ref()
      .is_some_and(|current| current.identity_eq(&source));

    if unchanged {
      self.state.rc_deref_mut().transform = transform.clone();
      if let AsyncSource::Value(value) = source {
        let out = apply(&transform, value);
        self.state.rc_deref_mut().pending = Some(Some(out.clone()));
        return Rendered::Value(Some(out));
      }
      return match self.state.rc_deref().pending.clone() {
        Some(value) => Rendered::Value(value),
        None => Rendered::NoChange,
      };
    }

    self.teardown_current();
    {
      let mut st = self.state.rc_deref_mut();
      st.source = Some(source.clone());
      st.transform = transform.clone();
      st.pending = None;
      st.subscriber = None;
    }

    match source {
      AsyncSource::Value(value) => {
        let out = apply(&transform, value);
        self.state.rc_deref_mut().pending = Some(Some(out.clone()));
        Rendered::Value(Some(out))
      }
      AsyncSource::Future(future) => {
        self.await_future(future);
        Rendered::NoChange
      }
      AsyncSource::Sequence(sequence) => {
        // A replay, if the cache holds a value already, fires inside this
        // call and flows through the notify channel, not the return value.
        self.subscribe_sequence(sequence);
        Rendered::NoChange
      }
    }
  }
}

impl<T> Tracker<T> {
  /// Leave the active tree: the sequence callback is unsubscribed (the
  /// producer keeps running for other observers) and async pushes are
  /// suppressed until [`Tracker::on_reattach`].
  pub fn on_detach(&self) {
    let unsubscribe = {
      let mut st = self.state.rc_deref_mut();
      if !st.attached {
        return;
      }
      st.attached = false;
      match (&st.source, &st.subscriber) {
        (Some(AsyncSource::Sequence(s)), Some(subscriber)) => {
          Some((s.clone(), subscriber.clone()))
        }
        _ => None,
      }
    };
    if let Some((sequence, subscriber)) = unsubscribe {
      self.cache.unsubscribe(&sequence, &subscriber);
    }
  }

  fn teardown_current(&self) {
    let teardown = {
      let mut st = self.state.rc_deref_mut();
      let sequence = match &st.source {
        Some(AsyncSource::Sequence(s)) => Some(s.clone()),
        _ => None,
      };
      (sequence, st.subscriber.take())
    };
    if let (Some(sequence), Some(subscriber)) = teardown {
      self.cache.unsubscribe(&sequence, &subscriber);
    }
  }
}

impl<T> Drop for Tracker<T> {
  fn drop(&mut self) { self.teardown_current(); }
}

fn apply<T>(transform: &Option<Transform<T>>, value: T) -> T {
  match transform {
    Some(transform) => transform(value),
    None => value,
  }
}

fn push<T: Clone>(state: &MutRc<TrackerState<T>>, notify: &Notify<T>, value: Option<T>) {
  let attached = {
    let mut st = state.rc_deref_mut();
    st.pending = Some(value.clone());
    st.attached
  };
  if attached {
    notify(value);
  }
}
