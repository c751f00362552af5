//! Shareable values that can be replaced from `&self`.

use std::{
	any::type_name,
	fmt,
	sync::{Arc, RwLock},
};

/// A shareable value that doesn't keep a lock when it is read.
///
/// This is essentially an `Arc<RwLock<T: Clone>>`: `replace` takes a write
/// lock, `get` takes a read lock just long enough to clone the value out, so
/// a reader never holds the lock while using the value.
///
/// See [`ChangeableFn`] for a specialised variant wrapping an [`Fn`].
#[derive(Clone)]
pub struct Changeable<T>(Arc<RwLock<T>>);

impl<T> Changeable<T>
where
	T: Clone + Send,
{
	/// Create a new Changeable.
	///
	/// If `T: Default`, prefer `::default()`.
	#[must_use]
	pub fn new(value: T) -> Self {
		Self(Arc::new(RwLock::new(value)))
	}

	/// Replace the value with a new one.
	///
	/// Panics if the lock was poisoned.
	pub fn replace(&self, new: T) {
		*(self.0.write().expect("changeable lock poisoned")) = new;
	}

	/// Get a clone of the current value.
	///
	/// Panics if the lock was poisoned.
	#[must_use]
	pub fn get(&self) -> T {
		self.0.read().expect("changeable lock poisoned").clone()
	}
}

impl<T> Default for Changeable<T>
where
	T: Clone + Send + Default,
{
	fn default() -> Self {
		Self::new(T::default())
	}
}

impl<T> fmt::Debug for Changeable<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Changeable").field("inner type", &type_name::<T>()).finish_non_exhaustive()
	}
}

/// A shareable `Fn` that doesn't hold a lock when it is called.
///
/// A specialisation of [`Changeable`] for the single-argument-single-return
/// closure case, used for hooks that can be swapped at runtime (the error
/// handler, the observer factory).
pub struct ChangeableFn<T, U>(Changeable<Arc<dyn (Fn(T) -> U) + Send + Sync>>);

impl<T, U> ChangeableFn<T, U>
where
	T: Send,
	U: Send,
{
	/// Wrap a closure.
	pub fn new(f: impl (Fn(T) -> U) + Send + Sync + 'static) -> Self {
		Self(Changeable::new(Arc::new(f)))
	}

	/// Replace the fn with a new one.
	///
	/// Panics if the lock was poisoned.
	pub fn replace(&self, new: impl (Fn(T) -> U) + Send + Sync + 'static) {
		self.0.replace(Arc::new(new));
	}

	/// Call the fn.
	///
	/// Panics if the lock was poisoned.
	pub fn call(&self, data: T) -> U {
		(self.0.get())(data)
	}
}

// the derive would add a spurious T: Clone bound
impl<T, U> Clone for ChangeableFn<T, U> {
	fn clone(&self) -> Self {
		Self(Changeable::clone(&self.0))
	}
}

impl<T, U> Default for ChangeableFn<T, U>
where
	T: Send,
	U: Send + Default,
{
	fn default() -> Self {
		Self::new(|_| U::default())
	}
}

impl<T, U> fmt::Debug for ChangeableFn<T, U> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChangeableFn").field("payload type", &type_name::<T>()).field("return type", &type_name::<U>()).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn get_reflects_the_latest_replace() {
		let value = Changeable::new(1);
		assert_eq!(value.get(), 1);
		value.replace(2);
		assert_eq!(value.get(), 2);
	}

	#[test]
	fn changeable_fn_calls_the_latest_closure() {
		let f = ChangeableFn::new(|n: i32| n + 1);
		assert_eq!(f.call(1), 2);
		f.replace(|n: i32| n * 10);
		assert_eq!(f.call(1), 10);
	}
}
