//! Keyed callback registry.
//!
//! Listeners are stored in a concurrent map and invoked from a snapshot, so
//! a callback may subscribe or unsubscribe other listeners while it runs.
//! Dropping a [`Subscription`] does not remove the listener; only
//! [`Subscription::unsubscribe`] does.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared callback type used by every listener set.
pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
	next_id: AtomicU64,
	listeners: DashMap<u64, Callback<T>>,
}

/// A set of callbacks for one event type.
pub struct ListenerSet<T> {
	inner: Arc<Inner<T>>,
}

impl<T> Clone for ListenerSet<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T: 'static> Default for ListenerSet<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: 'static> ListenerSet<T> {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				next_id: AtomicU64::new(0),
				listeners: DashMap::new(),
			}),
		}
	}

	/// Registers a callback and returns the handle that removes it.
	pub fn subscribe<F>(&self, callback: F) -> Subscription
	where
		F: Fn(&T) + Send + Sync + 'static,
	{
		self.subscribe_arc(Arc::new(callback))
	}

	pub fn subscribe_arc(&self, callback: Callback<T>) -> Subscription {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		self.inner.listeners.insert(id, callback);

		let inner = self.inner.clone();
		Subscription::new(move || {
			inner.listeners.remove(&id);
		})
	}

	/// Calls every registered listener with `value`, in registration order.
	pub fn emit(&self, value: &T) {
		let mut snapshot: Vec<(u64, Callback<T>)> = self
			.inner
			.listeners
			.iter()
			.map(|entry| (*entry.key(), entry.value().clone()))
			.collect();
		snapshot.sort_by_key(|(id, _)| *id);

		for (_, callback) in snapshot {
			callback(value);
		}
	}

	pub fn len(&self) -> usize {
		self.inner.listeners.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.listeners.is_empty()
	}

	pub fn clear(&self) {
		self.inner.listeners.clear();
	}
}

/// Handle returned by every `on_*`/`subscribe` call.
#[must_use = "the listener stays registered until unsubscribe() is called"]
pub struct Subscription {
	teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
	pub fn new<F>(teardown: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		Self {
			teardown: Some(Box::new(teardown)),
		}
	}

	/// A handle with nothing to tear down.
	pub fn noop() -> Self {
		Self { teardown: None }
	}

	/// Runs `extra` after this subscription's own teardown.
	pub fn and_then<F>(mut self, extra: F) -> Self
	where
		F: FnOnce() + Send + 'static,
	{
		let first = self.teardown.take();
		Self::new(move || {
			if let Some(first) = first {
				first();
			}
			extra();
		})
	}

	pub fn unsubscribe(mut self) {
		if let Some(teardown) = self.teardown.take() {
			teardown();
		}
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("active", &self.teardown.is_some())
			.finish()
	}
}
