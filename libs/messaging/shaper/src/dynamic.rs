use crate::{
    AgentChannel, ChannelShaper, FilterUpdateListener, ShaperError, ShaperResult, SubscriptionExecutor,
    SubscriptionFilter,
};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;
use types::Contract;

struct Inner {
    base: ChannelShaper,
    filter: Arc<dyn SubscriptionFilter>,
    refresh: Mutex<()>,
}

impl Inner {
    /// Snapshot and apply happen under one lock so a stale snapshot never
    /// overwrites a newer one
    fn refresh(&self) {
        let _guard = self.refresh.lock();
        self.base.apply_subscription_filter(self.filter.updated());
    }
}

struct Refresher(Weak<Inner>);

impl FilterUpdateListener for Refresher {
    fn filter_updated(&self, _filter: &dyn SubscriptionFilter) {
        if let Some(inner) = self.0.upgrade() {
            debug!(contract = %inner.base.contract(), "Applying updated subscription filter");
            inner.refresh();
        }
    }
}

/// A channel shaper that follows one evolving subscription filter.
///
/// On [`bind`](Self::bind) the shaper registers for filter updates before it
/// takes the first snapshot, so an update that races with binding is never
/// lost. Every update re-snapshots the filter and reconfigures the channel
/// synchronously in the notifying thread. The filter itself cannot be
/// replaced.
pub struct DynamicChannelShaper {
    inner: Arc<Inner>,
    refresher: Arc<dyn FilterUpdateListener>,
    registered: AtomicBool,
}

impl DynamicChannelShaper {
    pub fn new(
        contract: Contract,
        executor: Option<Arc<dyn SubscriptionExecutor>>,
        keep_rejected: bool,
        filter: Arc<dyn SubscriptionFilter>,
    ) -> Self {
        let base = ChannelShaper::with_filter(contract, executor, keep_rejected, filter.updated(), true);
        Self::wrap(base, filter)
    }

    fn wrap(base: ChannelShaper, filter: Arc<dyn SubscriptionFilter>) -> Self {
        let inner = Arc::new(Inner {
            base,
            filter,
            refresh: Mutex::new(()),
        });
        let refresher: Arc<dyn FilterUpdateListener> = Arc::new(Refresher(Arc::downgrade(&inner)));
        Self {
            inner,
            refresher,
            registered: AtomicBool::new(false),
        }
    }

    /// The evolving filter this shaper follows
    pub fn filter(&self) -> &Arc<dyn SubscriptionFilter> {
        &self.inner.filter
    }

    pub fn bind(&self, channel: Arc<dyn AgentChannel>) -> ShaperResult<()> {
        if self.inner.base.is_bound() {
            return Err(ShaperError::AlreadyBound);
        }
        if !self.registered.swap(true, Ordering::AcqRel) {
            self.inner.filter.add_update_listener(self.refresher.clone());
        }
        self.inner.refresh();
        self.inner.base.bind(channel)
    }

    /// Always fails: the filter only evolves through its own updates
    pub fn set_subscription_filter(&self, _filter: Arc<dyn SubscriptionFilter>) -> ShaperResult<()> {
        Err(ShaperError::DynamicFilterReplacement)
    }

    /// Stops following the filter and releases the binding
    pub fn close(&self) {
        self.unregister();
        self.inner.base.close();
    }

    /// An unbound copy following the same filter
    pub fn try_clone(&self) -> ShaperResult<DynamicChannelShaper> {
        let base = self.inner.base.duplicate(self.inner.filter.updated(), true)?;
        Ok(Self::wrap(base, self.inner.filter.clone()))
    }

    fn unregister(&self) {
        if self.registered.swap(false, Ordering::AcqRel) {
            self.inner.filter.remove_update_listener(&self.refresher);
        }
    }
}

impl Deref for DynamicChannelShaper {
    type Target = ChannelShaper;

    fn deref(&self) -> &ChannelShaper {
        &self.inner.base
    }
}

impl Drop for DynamicChannelShaper {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for DynamicChannelShaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicChannelShaper")
            .field("base", &self.inner.base)
            .field("filter", &self.inner.filter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DynamicFilter, SymbolSetFilter};

    #[derive(Default)]
    struct SnapshotChannel(Mutex<Vec<bool>>);

    impl AgentChannel for SnapshotChannel {
        fn reconfigure_if_needed(&self, shaper: &ChannelShaper) {
            self.0.lock().push(shaper.accepts_subscription(0, "MSFT"));
        }
    }

    fn shaper(filter: &Arc<DynamicFilter>) -> DynamicChannelShaper {
        DynamicChannelShaper::new(Contract::Ticker, None, false, filter.clone())
    }

    #[test]
    fn test_update_before_bind_is_picked_up() {
        let filter = Arc::new(DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"]))));
        let shaper = shaper(&filter);
        filter.update(Arc::new(SymbolSetFilter::new(["MSFT"])));

        let channel = Arc::new(SnapshotChannel::default());
        shaper.bind(channel.clone()).unwrap();
        assert_eq!(*channel.0.lock(), [true]);
        assert_eq!(filter.listener_count(), 1);
    }

    #[test]
    fn test_update_after_bind_reconfigures() {
        let filter = Arc::new(DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"]))));
        let shaper = shaper(&filter);
        let channel = Arc::new(SnapshotChannel::default());
        shaper.bind(channel.clone()).unwrap();

        filter.update(Arc::new(SymbolSetFilter::new(["MSFT"])));
        assert_eq!(*channel.0.lock(), [false, true]);
    }

    #[test]
    fn test_filter_cannot_be_replaced() {
        let filter = Arc::new(DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"]))));
        let shaper = shaper(&filter);
        let other = Arc::new(SymbolSetFilter::new(["MSFT"]));
        assert_eq!(
            shaper.set_subscription_filter(other.clone()),
            Err(ShaperError::DynamicFilterReplacement)
        );
        let base: &ChannelShaper = &shaper;
        assert_eq!(
            base.set_subscription_filter(other),
            Err(ShaperError::DynamicFilterReplacement)
        );
    }

    #[test]
    fn test_close_unregisters() {
        let filter = Arc::new(DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"]))));
        let shaper = shaper(&filter);
        let channel = Arc::new(SnapshotChannel::default());
        shaper.bind(channel.clone()).unwrap();
        assert_eq!(shaper.bind(channel.clone()), Err(ShaperError::AlreadyBound));
        assert_eq!(filter.listener_count(), 1);

        shaper.close();
        assert_eq!(filter.listener_count(), 0);
        filter.update(Arc::new(SymbolSetFilter::new(["MSFT"])));
        assert_eq!(channel.0.lock().len(), 1);
    }

    #[test]
    fn test_clone_follows_same_filter() {
        let filter = Arc::new(DynamicFilter::new("feed", Arc::new(SymbolSetFilter::new(["IBM"]))));
        let shaper = shaper(&filter);
        shaper.set_weight(9).unwrap();
        let copy = shaper.try_clone().unwrap();
        assert_eq!(copy.weight(), 9);
        assert!(Arc::ptr_eq(copy.filter(), shaper.filter()));
        drop(copy);
        assert_eq!(filter.listener_count(), 0);
    }
}
