//! Shared-ownership cell for the single-threaded context.
//!
//! Everything in this crate runs on one event loop, so shared mutable state
//! is `Rc<RefCell<T>>`. `MutRc` names that pattern once and keeps borrow
//! scopes explicit at call sites via `rc_deref`/`rc_deref_mut`.

use std::{
  cell::{Ref, RefCell, RefMut},
  rc::Rc,
};

pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(t: T) -> Self { Self(Rc::new(RefCell::new(t))) }

  #[inline]
  pub fn rc_deref(&self) -> Ref<'_, T> { self.0.borrow() }

  #[inline]
  pub fn rc_deref_mut(&self) -> RefMut<'_, T> { self.0.borrow_mut() }

  /// Reference identity: do both handles point at the same allocation?
  #[inline]
  pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

impl<T> Clone for MutRc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T: Default> Default for MutRc<T> {
  fn default() -> Self { Self::own(T::default()) }
}
