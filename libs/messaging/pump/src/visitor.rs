use codec::{HeartbeatPayload, ProtocolDescriptor};
use types::{Contract, DataProvider, MessageType, SubscriptionProvider};

/// Outbound side of the pump: receives messages pulled out of a provider.
///
/// Every `visit_*` method returns `true` when the visitor could not take
/// everything offered, so the provider must keep the rest pending.
pub trait MessageVisitor {
    fn visit_describe_protocol(&mut self, _desc: &ProtocolDescriptor) -> bool {
        false
    }

    fn visit_heartbeat(&mut self, _heartbeat: &HeartbeatPayload) -> bool {
        false
    }

    /// Drains data records for `message` out of `provider`
    fn visit_data(&mut self, provider: &mut DataProvider<'_>, message: MessageType) -> bool;

    /// Drains subscription records for `message` out of `provider`
    fn visit_subscription(&mut self, provider: &mut SubscriptionProvider<'_>, message: MessageType) -> bool;

    /// Messages with no canonical type; the default treats them as fully consumed
    fn visit_other_message(&mut self, _type_id: i32, _payload: &[u8]) -> bool {
        false
    }

    fn visit_contract_data(&mut self, contract: Contract, provider: &mut DataProvider<'_>) -> bool {
        self.visit_data(provider, MessageType::for_data(contract))
    }

    fn visit_contract_add_subscription(&mut self, contract: Contract, provider: &mut SubscriptionProvider<'_>) -> bool {
        self.visit_subscription(provider, MessageType::for_add_subscription(contract))
    }

    fn visit_contract_remove_subscription(
        &mut self,
        contract: Contract,
        provider: &mut SubscriptionProvider<'_>,
    ) -> bool {
        self.visit_subscription(provider, MessageType::for_remove_subscription(contract))
    }
}
