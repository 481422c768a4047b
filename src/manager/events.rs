//! Lifecycle event hooks.
//!
//! The manager never persists anything itself; it announces persistence-worthy state
//! through these hooks so the host application can store a rotated refresh token or a
//! freshly generated DPoP keypair across restarts.

// self
use crate::{_prelude::*, dpop::DpopKeyMaterial};

/// Persistence-worthy lifecycle notifications.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagerEvent {
	/// The server issued a new refresh token.
	RefreshTokenIssued(String),
	/// A new DPoP keypair was generated for the current session.
	DpopKeypairCreated(DpopKeyMaterial),
}

/// Listener invoked synchronously for every emitted event.
pub type EventHook = Box<dyn Fn(&ManagerEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct EventHooks {
	hooks: RwLock<Vec<EventHook>>,
}
impl EventHooks {
	pub fn subscribe(&self, hook: EventHook) {
		self.hooks.write().push(hook);
	}

	pub fn emit(&self, event: &ManagerEvent) {
		for hook in self.hooks.read().iter() {
			hook(event);
		}
	}
}
