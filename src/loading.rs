//! Placeholder-first wrapper around any async source.
//!
//! `loading` turns a source into a sequence that yields a placeholder value
//! immediately and then everything the wrapped source produces. Render sites
//! get something to show while the real value is on its way.

use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  future,
  stream::{self, LocalBoxStream, StreamExt},
  Stream,
};
use pin_project_lite::pin_project;

use crate::source::{AsyncSource, SequenceItem, SequenceSource};

/// Wrap `source` in a sequence that yields `placeholder` first.
///
/// The tail follows the source's class: a plain value is yielded once, a
/// future contributes its one resolution, and a sequence is drained through
/// the same shared stream object. Failures pass through unchanged and hit
/// observers as the usual sentinel.
pub fn loading<T: Clone + 'static>(source: AsyncSource<T>, placeholder: T) -> SequenceSource<T> {
  let rest: LocalBoxStream<'static, SequenceItem<T>> = match source {
    AsyncSource::Value(value) => stream::once(future::ready(Ok(value))).boxed_local(),
    AsyncSource::Future(fut) => stream::once(fut.resolved()).boxed_local(),
    AsyncSource::Sequence(seq) => stream::unfold(seq, |seq| async move {
      seq.pull().await.map(|item| (item, seq))
    })
    .boxed_local(),
  };
  SequenceSource::from_items(Loading { placeholder: Some(placeholder), rest })
}

pin_project! {
  struct Loading<T> {
    placeholder: Option<T>,
    #[pin]
    rest: LocalBoxStream<'static, SequenceItem<T>>,
  }
}

impl<T> Stream for Loading<T> {
  type Item = SequenceItem<T>;

  fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    let this = self.project();
    if let Some(placeholder) = this.placeholder.take() {
      return Poll::Ready(Some(Ok(placeholder)));
    }
    this.rest.poll_next(cx)
  }
}
