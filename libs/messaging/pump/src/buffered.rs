use crate::{ListenerSlot, MessageListener, MessageMask, MessageProvider, MessageVisitor, PumpError, PumpResult};
use bytes::Bytes;
use codec::{HeartbeatPayload, ProtocolDescriptor};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::trace;
use types::{DataRecord, MessageType, RecordBuffer, SubscriptionRecord};

#[derive(Debug, Default)]
struct Pending {
    describe: Option<ProtocolDescriptor>,
    heartbeat: Option<HeartbeatPayload>,
    data: BTreeMap<MessageType, RecordBuffer<DataRecord>>,
    subscriptions: BTreeMap<MessageType, RecordBuffer<SubscriptionRecord>>,
    other: VecDeque<(i32, Bytes)>,
}

/// In-memory message provider fed by producer threads.
///
/// Retrieval drains only what the visitor accepts; anything left stays
/// queued and keeps its bit in the pending mask.
#[derive(Debug, Default)]
pub struct BufferedProvider {
    pending: Mutex<Pending>,
    mask: MessageMask,
    listener: ListenerSlot,
}

impl BufferedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        !self.mask.is_empty()
    }

    /// Queues a handshake; a newer one replaces a descriptor not yet sent
    pub fn set_describe_protocol(&self, desc: ProtocolDescriptor) {
        self.pending.lock().describe = Some(desc);
        self.mark(MessageType::DescribeProtocol.id());
    }

    pub fn add_heartbeat(&self, heartbeat: HeartbeatPayload) {
        self.pending.lock().heartbeat = Some(heartbeat);
        self.mark(MessageType::Heartbeat.id());
    }

    pub fn add_data(&self, message: MessageType, records: impl IntoIterator<Item = DataRecord>) -> PumpResult<()> {
        if !message.is_data() || message.contract().is_none() {
            return Err(PumpError::NotRecordMessage(message));
        }
        self.pending.lock().data.entry(message).or_default().extend(records);
        self.mark(message.id());
        Ok(())
    }

    pub fn add_subscription(
        &self,
        message: MessageType,
        records: impl IntoIterator<Item = SubscriptionRecord>,
    ) -> PumpResult<()> {
        if !message.is_subscription() {
            return Err(PumpError::NotRecordMessage(message));
        }
        self.pending.lock().subscriptions.entry(message).or_default().extend(records);
        self.mark(message.id());
        Ok(())
    }

    pub fn add_other_message(&self, type_id: i32, payload: Bytes) {
        self.pending.lock().other.push_back((type_id, payload));
        self.mark(type_id);
    }

    fn mark(&self, type_id: i32) {
        self.mask.add(type_id);
        self.listener.notify(self);
    }

    /// Visits pending messages in wire order, stopping at the first one the visitor cannot take.
    ///
    /// Returns `true` if the visitor ran out of room.
    fn visit_pending(pending: &mut Pending, visitor: &mut dyn MessageVisitor) -> bool {
        if let Some(desc) = pending.describe.take() {
            if visitor.visit_describe_protocol(&desc) {
                pending.describe = Some(desc);
                return true;
            }
        }
        if let Some(heartbeat) = pending.heartbeat.take() {
            if visitor.visit_heartbeat(&heartbeat) {
                pending.heartbeat = Some(heartbeat);
                return true;
            }
        }
        for message in MessageType::ALL.into_iter().filter(MessageType::has_records) {
            let more = if message.is_data() {
                pending
                    .data
                    .get_mut(&message)
                    .is_some_and(|records| visitor.visit_data(records, message))
            } else {
                pending
                    .subscriptions
                    .get_mut(&message)
                    .is_some_and(|records| visitor.visit_subscription(records, message))
            };
            if more {
                return true;
            }
        }
        while let Some((type_id, payload)) = pending.other.pop_front() {
            if visitor.visit_other_message(type_id, &payload) {
                pending.other.push_front((type_id, payload));
                return true;
            }
        }
        false
    }

    /// Mask bits for everything still queued
    fn still_queued(pending: &Pending) -> u64 {
        let mut bits = 0;
        if pending.describe.is_some() {
            bits |= MessageMask::bit(MessageType::DescribeProtocol.id());
        }
        if pending.heartbeat.is_some() {
            bits |= MessageMask::bit(MessageType::Heartbeat.id());
        }
        for message in pending.data.keys().chain(pending.subscriptions.keys()) {
            bits |= MessageMask::bit(message.id());
        }
        for (type_id, _) in &pending.other {
            bits |= MessageMask::bit(*type_id);
        }
        bits
    }
}

impl MessageProvider for BufferedProvider {
    fn retrieve_messages(&self, visitor: &mut dyn MessageVisitor) -> bool {
        if self.mask.retrieve() == 0 {
            return false;
        }
        let mut pending = self.pending.lock();
        // Anything added after the swap has re-marked the mask already
        let full = Self::visit_pending(&mut pending, visitor);
        pending.data.retain(|_, r| !r.is_empty());
        pending.subscriptions.retain(|_, r| !r.is_empty());
        let keep = Self::still_queued(&pending);
        drop(pending);
        if keep != 0 {
            self.mask.add_bits(keep);
        }
        trace!(full, keep, "Retrieved pending messages");
        !self.mask.is_empty()
    }

    fn set_message_listener(&self, listener: Option<Arc<dyn MessageListener>>) {
        self.listener.replace(listener, self, || self.has_pending());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CountingVisitor, RecordingListener};

    fn quotes(n: usize) -> Vec<DataRecord> {
        (0..n).map(|i| DataRecord::new(0, format!("SYM{i}"), vec![i as i32])).collect()
    }

    #[test]
    fn test_rejects_non_record_types() {
        let provider = BufferedProvider::new();
        assert_eq!(
            provider.add_data(MessageType::TickerAddSubscription, quotes(1)),
            Err(PumpError::NotRecordMessage(MessageType::TickerAddSubscription))
        );
        assert!(provider.add_subscription(MessageType::StreamData, vec![]).is_err());
        assert!(provider.add_data(MessageType::RawData, quotes(1)).is_err());
        assert!(!provider.has_pending());
    }

    #[test]
    fn test_drains_in_capacity_sized_steps() {
        let provider = BufferedProvider::new();
        provider.add_data(MessageType::TickerData, quotes(5)).unwrap();

        let mut visitor = CountingVisitor::with_capacity(2);
        assert!(provider.retrieve_messages(&mut visitor));
        assert_eq!(visitor.data_records(), 2);

        visitor.reset_capacity(2);
        assert!(provider.retrieve_messages(&mut visitor));
        visitor.reset_capacity(2);
        assert!(!provider.retrieve_messages(&mut visitor));
        assert_eq!(visitor.data_records(), 5);
        assert!(!provider.has_pending());
    }

    #[test]
    fn test_exact_fit_reports_drained() {
        let provider = BufferedProvider::new();
        provider.add_data(MessageType::StreamData, quotes(3)).unwrap();
        let mut visitor = CountingVisitor::with_capacity(3);
        assert!(!provider.retrieve_messages(&mut visitor));
        assert!(!provider.has_pending());
    }

    #[test]
    fn test_handshake_goes_first() {
        let provider = BufferedProvider::new();
        provider.add_data(MessageType::TickerData, quotes(1)).unwrap();
        provider.set_describe_protocol(ProtocolDescriptor::new_self("qtp"));
        let mut visitor = CountingVisitor::unlimited();
        assert!(!provider.retrieve_messages(&mut visitor));
        assert_eq!(
            visitor.order(),
            [MessageType::DescribeProtocol.id(), MessageType::TickerData.id()]
        );
    }

    #[test]
    fn test_listener_notified_on_add() {
        let provider = BufferedProvider::new();
        let listener = Arc::new(RecordingListener::new());
        provider.set_message_listener(Some(listener.clone()));
        assert_eq!(listener.count(), 0);

        provider
            .add_subscription(MessageType::TickerAddSubscription, vec![SubscriptionRecord::new(0, "IBM", 0)])
            .unwrap();
        assert_eq!(listener.count(), 1);
    }

    #[test]
    fn test_other_messages_drain_in_order() {
        let provider = BufferedProvider::new();
        provider.add_other_message(100, Bytes::from_static(b"a"));
        provider.add_other_message(101, Bytes::from_static(b"b"));
        let mut visitor = CountingVisitor::unlimited();
        assert!(!provider.retrieve_messages(&mut visitor));
        assert_eq!(visitor.order(), [100, 101]);
    }
}
