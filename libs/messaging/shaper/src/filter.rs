//! Record and subscription filters
//!
//! A [`RecordFilter`] is an immutable predicate. A [`SubscriptionFilter`] may
//! additionally be *dynamic*: its accepted set evolves over time and registered
//! [`FilterUpdateListener`]s are told when it does. Consumers never evaluate a
//! dynamic filter directly; they work on the immutable snapshot returned by
//! [`SubscriptionFilter::updated`].

use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use types::Contract;

/// Decides whether a record (by contract, record id and symbol) passes
pub trait RecordFilter: fmt::Debug + Send + Sync {
    fn accept(&self, contract: Contract, record_id: i32, symbol: &str) -> bool;
}

/// Told when a dynamic filter changes
pub trait FilterUpdateListener: Send + Sync {
    fn filter_updated(&self, filter: &dyn SubscriptionFilter);
}

/// A record filter applied to subscription, possibly evolving over time
pub trait SubscriptionFilter: RecordFilter {
    fn is_dynamic(&self) -> bool {
        false
    }

    /// Immutable snapshot of the current state of this filter
    fn updated(&self) -> Arc<dyn SubscriptionFilter>;

    fn add_update_listener(&self, _listener: Arc<dyn FilterUpdateListener>) {}

    fn remove_update_listener(&self, _listener: &Arc<dyn FilterUpdateListener>) {}
}

/// Accepts every record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnyFilter;

impl AnyFilter {
    pub fn shared() -> Arc<dyn SubscriptionFilter> {
        Arc::new(AnyFilter)
    }
}

impl RecordFilter for AnyFilter {
    fn accept(&self, _contract: Contract, _record_id: i32, _symbol: &str) -> bool {
        true
    }
}

impl SubscriptionFilter for AnyFilter {
    fn updated(&self) -> Arc<dyn SubscriptionFilter> {
        Arc::new(*self)
    }
}

/// Accepts records whose symbol is in a fixed set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolSetFilter {
    symbols: Arc<HashSet<String>>,
}

impl SymbolSetFilter {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            symbols: Arc::new(symbols.into_iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }
}

impl RecordFilter for SymbolSetFilter {
    fn accept(&self, _contract: Contract, _record_id: i32, symbol: &str) -> bool {
        self.contains(symbol)
    }
}

impl SubscriptionFilter for SymbolSetFilter {
    fn updated(&self) -> Arc<dyn SubscriptionFilter> {
        Arc::new(self.clone())
    }
}

/// Adapts any record filter into a named, non-dynamic subscription filter
#[derive(Clone)]
pub struct StaticFilter {
    name: Arc<str>,
    inner: Arc<dyn RecordFilter>,
}

impl StaticFilter {
    pub fn new(name: impl Into<Arc<str>>, inner: Arc<dyn RecordFilter>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for StaticFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticFilter")
            .field("name", &self.name)
            .field("inner", &self.inner)
            .finish()
    }
}

impl RecordFilter for StaticFilter {
    fn accept(&self, contract: Contract, record_id: i32, symbol: &str) -> bool {
        self.inner.accept(contract, record_id, symbol)
    }
}

impl SubscriptionFilter for StaticFilter {
    fn updated(&self) -> Arc<dyn SubscriptionFilter> {
        Arc::new(self.clone())
    }
}

/// A filter whose state is replaced at runtime.
///
/// [`update`](Self::update) swaps the current snapshot first and only then
/// notifies listeners, so a listener that reads [`updated`](SubscriptionFilter::updated)
/// from inside its callback always sees the new state. Listeners are called
/// in registration order, outside of any internal lock.
pub struct DynamicFilter {
    name: Arc<str>,
    current: RwLock<Arc<dyn SubscriptionFilter>>,
    listeners: Mutex<Vec<Arc<dyn FilterUpdateListener>>>,
}

impl DynamicFilter {
    pub fn new(name: impl Into<Arc<str>>, initial: Arc<dyn SubscriptionFilter>) -> Self {
        Self {
            name: name.into(),
            current: RwLock::new(initial.updated()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the current state and notifies every registered listener
    pub fn update(&self, filter: Arc<dyn SubscriptionFilter>) {
        *self.current.write() = filter.updated();
        let listeners = self.listeners.lock().clone();
        debug!(filter = %self.name, listeners = listeners.len(), "Filter updated");
        for listener in listeners {
            listener.filter_updated(self);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl fmt::Debug for DynamicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicFilter")
            .field("name", &self.name)
            .field("current", &*self.current.read())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl RecordFilter for DynamicFilter {
    fn accept(&self, contract: Contract, record_id: i32, symbol: &str) -> bool {
        self.current.read().accept(contract, record_id, symbol)
    }
}

impl SubscriptionFilter for DynamicFilter {
    fn is_dynamic(&self) -> bool {
        true
    }

    fn updated(&self) -> Arc<dyn SubscriptionFilter> {
        self.current.read().clone()
    }

    fn add_update_listener(&self, listener: Arc<dyn FilterUpdateListener>) {
        self.listeners.lock().push(listener);
    }

    fn remove_update_listener(&self, listener: &Arc<dyn FilterUpdateListener>) {
        self.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl FilterUpdateListener for Counter {
        fn filter_updated(&self, filter: &dyn SubscriptionFilter) {
            assert!(filter.updated().accept(Contract::Ticker, 0, "MSFT"));
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_symbol_set() {
        let filter = SymbolSetFilter::new(["IBM", "AAPL"]);
        assert!(filter.accept(Contract::Stream, 3, "IBM"));
        assert!(!filter.accept(Contract::Stream, 3, "MSFT"));
        assert!(!filter.is_dynamic());
    }

    #[test]
    fn test_static_filter_delegates() {
        let filter = StaticFilter::new("ibm-only", Arc::new(SymbolSetFilter::new(["IBM"])));
        assert_eq!(filter.name(), "ibm-only");
        assert!(filter.updated().accept(Contract::History, 1, "IBM"));
        assert!(!filter.updated().accept(Contract::History, 1, "GOOG"));
    }

    #[test]
    fn test_dynamic_filter_notifies_after_swap() {
        let filter = DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"])));
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn FilterUpdateListener> = counter.clone();
        filter.add_update_listener(listener.clone());

        let before = filter.updated();
        filter.update(Arc::new(SymbolSetFilter::new(["MSFT"])));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(before.accept(Contract::Ticker, 0, "IBM"));
        assert!(!filter.accept(Contract::Ticker, 0, "IBM"));

        filter.remove_update_listener(&listener);
        assert_eq!(filter.listener_count(), 0);
        filter.update(Arc::new(SymbolSetFilter::new(["MSFT", "IBM"])));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
