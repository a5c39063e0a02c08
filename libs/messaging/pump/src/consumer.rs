use codec::{HeartbeatPayload, ProtocolDescriptor};
use tracing::{debug, error, info, warn};
use types::{DataIterator, MessageType, SubscriptionIterator};

/// Inbound side of the pump: receives decoded messages and error signals.
///
/// The three `handle_*` entry points are distinct severities. A corrupted
/// stream ends the connection; corrupted and unknown messages are reported
/// per message and parsing goes on.
pub trait MessageConsumer {
    fn handle_corrupted_stream(&mut self) {
        error!("Corrupted QTP stream");
    }

    fn handle_corrupted_message(&mut self, type_id: i32) {
        warn!(type_id, "Corrupted QTP message");
    }

    fn handle_unknown_message(&mut self, type_id: i32) {
        debug!(type_id, "Unknown QTP message skipped");
    }

    fn process_describe_protocol(&mut self, desc: &ProtocolDescriptor, logged: bool) {
        if logged {
            info!("Received protocol descriptor {}", desc);
        }
    }

    fn process_heartbeat(&mut self, _heartbeat: &HeartbeatPayload) {}

    fn process_data(&mut self, records: &mut DataIterator<'_>, message: MessageType);

    fn process_subscription(&mut self, records: &mut SubscriptionIterator<'_>, message: MessageType);

    /// Handles a message with no canonical decoding.
    ///
    /// Returns `false` when the message was not recognized, which the parser
    /// reports through [`handle_unknown_message`](Self::handle_unknown_message).
    fn process_other_message(&mut self, _type_id: i32, _payload: &[u8]) -> bool {
        false
    }
}
