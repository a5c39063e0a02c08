use crate::MessageVisitor;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Pull-style source of outgoing messages
pub trait MessageProvider: Send + Sync {
    /// Moves as much as `visitor` accepts.
    ///
    /// Returns `true` if messages remain pending afterwards, `false` once
    /// everything available was drained.
    fn retrieve_messages(&self, visitor: &mut dyn MessageVisitor) -> bool;

    /// Installs `listener` in place of the current one.
    ///
    /// If messages are already pending, the new listener is notified before
    /// this call returns.
    fn set_message_listener(&self, listener: Option<Arc<dyn MessageListener>>);
}

/// Receives "messages available" signals from a provider
pub trait MessageListener: Send + Sync {
    fn messages_available(&self, provider: &dyn MessageProvider);
}

/// Single-listener slot shared by a provider and its producers
#[derive(Default)]
pub struct ListenerSlot {
    listener: Mutex<Option<Arc<dyn MessageListener>>>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.listener.lock().is_some()
    }

    /// Swaps in `listener` and returns the previous one.
    ///
    /// `pending` is evaluated together with the swap; when it reports
    /// pending messages the new listener is notified once, after the slot
    /// lock is released.
    pub fn replace(
        &self,
        listener: Option<Arc<dyn MessageListener>>,
        provider: &dyn MessageProvider,
        pending: impl FnOnce() -> bool,
    ) -> Option<Arc<dyn MessageListener>> {
        let (previous, notify) = {
            let mut slot = self.listener.lock();
            let previous = std::mem::replace(&mut *slot, listener);
            let notify = if slot.is_some() && pending() { slot.clone() } else { None };
            (previous, notify)
        };
        if let Some(listener) = notify {
            listener.messages_available(provider);
        }
        previous
    }

    /// Signals the currently installed listener, if any.
    ///
    /// A listener replaced while this call runs may still receive it.
    pub fn notify(&self, provider: &dyn MessageProvider) {
        let current = self.listener.lock().clone();
        if let Some(listener) = current {
            listener.messages_available(provider);
        }
    }
}

impl fmt::Debug for ListenerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSlot").field("set", &self.is_set()).finish()
    }
}
