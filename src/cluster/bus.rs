//! Typed event bus distributing datanode reports to their handlers

use std::sync::Arc;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// An event subscriber. Handlers perform their own side effects on the
/// cluster managers and must swallow their own errors; they receive events
/// in the order they were dispatched.
#[async_trait]
pub trait EventHandler<E>: Send + Sync {
	async fn handle(&self, event: E);
}

/// Fan-out dispatcher for one event type. Each subscriber gets its own queue
/// and dispatch task, so a slow handler does not hold up the others.
pub struct EventBus<E> {
	subscribers: Vec<mpsc::UnboundedSender<E>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
	pub fn new() -> Self {
		Self {
			subscribers: vec![],
		}
	}

	/// Register a handler. The returned task drains the handler's queue and
	/// exits when the bus is dropped or `must_exit` becomes true.
	pub fn subscribe(
		&mut self,
		handler: Arc<dyn EventHandler<E>>,
		mut must_exit: watch::Receiver<bool>,
	) -> JoinHandle<()> {
		let (tx, mut rx) = mpsc::unbounded_channel();
		self.subscribers.push(tx);
		tokio::spawn(async move {
			while !*must_exit.borrow() {
				select! {
					event = rx.recv() => match event {
						Some(event) => handler.handle(event).await,
						None => break,
					},
					changed = must_exit.changed() => {
						if changed.is_err() {
							break;
						}
					}
				}
			}
		})
	}

	/// Deliver an event to every subscriber
	pub fn dispatch(&self, event: E) {
		for queue in &self.subscribers {
			let _ = queue.send(event.clone());
		}
	}
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
	fn default() -> Self {
		Self::new()
	}
}
