use crate::ChannelShaper;

/// The subscription routing endpoint a shaper is bound to.
///
/// The channel reads the shaper's current configuration whenever it is asked
/// to reconfigure; it must not call back into shaper setters from there.
pub trait AgentChannel: Send + Sync {
    fn reconfigure_if_needed(&self, shaper: &ChannelShaper);
}

pub type SubscriptionTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs subscription changes on behalf of a channel
pub trait SubscriptionExecutor: Send + Sync {
    fn execute(&self, task: SubscriptionTask);
}

/// Runs every task in the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl SubscriptionExecutor for InlineExecutor {
    fn execute(&self, task: SubscriptionTask) {
        task()
    }
}
