//! Several render sites sharing one ticking sequence.
//!
//! Run with `cargo run --example clock`.

use std::{cell::Cell, rc::Rc};

use futures::{executor::LocalPool, stream};
use rxtrack::prelude::*;

fn site(cache: &SequenceCache<i32>, name: &'static str) -> Tracker<i32> {
  Tracker::new(cache, move |v| match v {
    Some(tick) => println!("[{name}] tick {tick}"),
    None => println!("[{name}] <unresolved>"),
  })
}

fn main() {
  let mut pool = LocalPool::new();
  let cache = SequenceCache::new(pool.spawner());

  // One upstream clock, two observers. `pulls` shows the fan-out cost:
  // the tick count plus one, however many sites subscribe.
  let pulls = Rc::new(Cell::new(0));
  let counter = pulls.clone();
  let ticks = SequenceSource::from_values(stream::unfold(0, move |n| {
    counter.set(counter.get() + 1);
    async move { if n < 5 { Some((n + 1, n + 1)) } else { None } }
  }));

  let header = site(&cache, "header");
  let footer = site(&cache, "footer");
  header.render(AsyncSource::Sequence(ticks.clone()), None);
  footer.render(
    AsyncSource::Sequence(ticks.clone()),
    Some(Rc::new(|tick| tick * 60)),
  );
  pool.run_until_stalled();
  println!("upstream pulls: {}", pulls.get());

  // A site arriving after the clock finished is replayed the latest tick
  // synchronously at subscribe time.
  let sidebar = site(&cache, "sidebar");
  sidebar.render(AsyncSource::Sequence(ticks), None);

  // A loading wrapper gives a site something to show right away.
  let messages: SequenceCache<&'static str> = SequenceCache::new(pool.spawner());
  let banner = Tracker::new(&messages, |v| {
    println!("[banner] {}", v.unwrap_or("<unresolved>"));
  });
  let greeting = loading(
    AsyncSource::future(async { Ok::<_, BoxError>("hello, world") }),
    "loading...",
  );
  banner.render(AsyncSource::Sequence(greeting), None);
  pool.run_until_stalled();
}
