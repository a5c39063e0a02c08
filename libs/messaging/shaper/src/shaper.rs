use crate::{
    AgentChannel, AnyFilter, RecordFilter, ShaperError, ShaperResult, SubscriptionExecutor, SubscriptionFilter,
    SubscriptionTask,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use types::Contract;

pub const MIN_WEIGHT: u32 = 1;
pub const MAX_WEIGHT: u32 = 100;
pub const MAX_AGGREGATION_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

struct Settings {
    subscription_filter: Arc<dyn SubscriptionFilter>,
    data_filter: Option<Arc<dyn RecordFilter>>,
    weight: u32,
    aggregation_period: Duration,
}

/// Binds a contract, filters and an executor to one [`AgentChannel`].
///
/// Contract, executor and `keep_rejected` are fixed at construction. Filters,
/// weight and aggregation period may change at any time; filter and
/// aggregation changes ask the bound channel to reconfigure. Calls into the
/// channel never overlap and always observe the latest settings.
pub struct ChannelShaper {
    contract: Contract,
    executor: Option<Arc<dyn SubscriptionExecutor>>,
    keep_rejected: bool,
    filter_owned: bool,
    settings: RwLock<Settings>,
    channel: Mutex<Option<Arc<dyn AgentChannel>>>,
    reconfigure: Mutex<()>,
}

impl ChannelShaper {
    pub fn new(contract: Contract, executor: Option<Arc<dyn SubscriptionExecutor>>, keep_rejected: bool) -> Self {
        Self::with_filter(contract, executor, keep_rejected, AnyFilter::shared(), false)
    }

    /// Shaper for `contract` with no executor that drops rejected subscription
    pub fn for_contract(contract: Contract) -> Self {
        Self::new(contract, None, false)
    }

    pub(crate) fn with_filter(
        contract: Contract,
        executor: Option<Arc<dyn SubscriptionExecutor>>,
        keep_rejected: bool,
        subscription_filter: Arc<dyn SubscriptionFilter>,
        filter_owned: bool,
    ) -> Self {
        Self {
            contract,
            executor,
            keep_rejected,
            filter_owned,
            settings: RwLock::new(Settings {
                subscription_filter,
                data_filter: None,
                weight: MIN_WEIGHT,
                aggregation_period: Duration::ZERO,
            }),
            channel: Mutex::new(None),
            reconfigure: Mutex::new(()),
        }
    }

    pub fn contract(&self) -> Contract {
        self.contract
    }

    pub fn subscription_executor(&self) -> Option<&Arc<dyn SubscriptionExecutor>> {
        self.executor.as_ref()
    }

    pub fn keep_rejected(&self) -> bool {
        self.keep_rejected
    }

    pub fn is_bound(&self) -> bool {
        self.channel.lock().is_some()
    }

    pub fn subscription_filter(&self) -> Arc<dyn SubscriptionFilter> {
        self.settings.read().subscription_filter.clone()
    }

    pub fn data_filter(&self) -> Option<Arc<dyn RecordFilter>> {
        self.settings.read().data_filter.clone()
    }

    pub fn weight(&self) -> u32 {
        self.settings.read().weight
    }

    pub fn aggregation_period(&self) -> Duration {
        self.settings.read().aggregation_period
    }

    /// Whether subscription for `symbol` passes the subscription filter
    pub fn accepts_subscription(&self, record_id: i32, symbol: &str) -> bool {
        self.subscription_filter().accept(self.contract, record_id, symbol)
    }

    /// Whether data for `symbol` passes the data filter, if any
    pub fn accepts_data(&self, record_id: i32, symbol: &str) -> bool {
        self.data_filter()
            .map_or(true, |filter| filter.accept(self.contract, record_id, symbol))
    }

    /// Replaces the subscription filter.
    ///
    /// Fails for shapers owned by a [`DynamicChannelShaper`](crate::DynamicChannelShaper),
    /// whose filter evolves only through update notifications.
    pub fn set_subscription_filter(&self, filter: Arc<dyn SubscriptionFilter>) -> ShaperResult<()> {
        if self.filter_owned {
            return Err(ShaperError::DynamicFilterReplacement);
        }
        self.apply_subscription_filter(filter);
        Ok(())
    }

    pub(crate) fn apply_subscription_filter(&self, filter: Arc<dyn SubscriptionFilter>) {
        {
            let mut settings = self.settings.write();
            if Arc::ptr_eq(&settings.subscription_filter, &filter) {
                return;
            }
            settings.subscription_filter = filter;
        }
        self.reconfigure_if_needed();
    }

    pub fn set_data_filter(&self, filter: Option<Arc<dyn RecordFilter>>) {
        self.settings.write().data_filter = filter;
        self.reconfigure_if_needed();
    }

    /// Relative share of the channel among its siblings; takes effect on the next pass
    pub fn set_weight(&self, weight: u32) -> ShaperResult<()> {
        if !(MIN_WEIGHT..=MAX_WEIGHT).contains(&weight) {
            return Err(ShaperError::WeightOutOfLimits(weight));
        }
        self.settings.write().weight = weight;
        Ok(())
    }

    pub fn set_aggregation_period(&self, period: Duration) -> ShaperResult<()> {
        if period > MAX_AGGREGATION_PERIOD {
            return Err(ShaperError::AggregationPeriodOutOfLimits(period));
        }
        self.settings.write().aggregation_period = period;
        self.reconfigure_if_needed();
        Ok(())
    }

    /// Runs `task` in the subscription executor, or in the calling thread without one
    pub fn execute_subscription(&self, task: SubscriptionTask) {
        match &self.executor {
            Some(executor) => executor.execute(task),
            None => task(),
        }
    }

    /// Binds this shaper to `channel` and applies the current configuration to it
    pub fn bind(&self, channel: Arc<dyn AgentChannel>) -> ShaperResult<()> {
        {
            let mut slot = self.channel.lock();
            if slot.is_some() {
                return Err(ShaperError::AlreadyBound);
            }
            *slot = Some(channel);
        }
        debug!(contract = %self.contract, "Shaper bound");
        self.reconfigure_if_needed();
        Ok(())
    }

    /// Releases the binding; the shaper may be bound again afterwards
    pub fn close(&self) {
        if self.channel.lock().take().is_some() {
            debug!(contract = %self.contract, "Shaper closed");
        }
    }

    /// An unbound copy with the same configuration
    pub fn try_clone(&self) -> ShaperResult<ChannelShaper> {
        self.duplicate(self.subscription_filter(), false)
    }

    pub(crate) fn duplicate(
        &self,
        subscription_filter: Arc<dyn SubscriptionFilter>,
        filter_owned: bool,
    ) -> ShaperResult<ChannelShaper> {
        if self.is_bound() {
            return Err(ShaperError::CloneBound);
        }
        let copy = Self::with_filter(
            self.contract,
            self.executor.clone(),
            self.keep_rejected,
            subscription_filter,
            filter_owned,
        );
        {
            let settings = self.settings.read();
            let mut target = copy.settings.write();
            target.data_filter = settings.data_filter.clone();
            target.weight = settings.weight;
            target.aggregation_period = settings.aggregation_period;
        }
        Ok(copy)
    }

    fn reconfigure_if_needed(&self) {
        let _serial = self.reconfigure.lock();
        let channel = self.channel.lock().clone();
        if let Some(channel) = channel {
            trace!(contract = %self.contract, "Reconfiguring channel");
            channel.reconfigure_if_needed(self);
        }
    }
}

impl fmt::Debug for ChannelShaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let settings = self.settings.read();
        f.debug_struct("ChannelShaper")
            .field("contract", &self.contract)
            .field("keep_rejected", &self.keep_rejected)
            .field("subscription_filter", &settings.subscription_filter)
            .field("data_filter", &settings.data_filter)
            .field("weight", &settings.weight)
            .field("aggregation_period", &settings.aggregation_period)
            .field("bound", &self.is_bound())
            .finish()
    }
}
