use crate::{MessageConsumer, MessageListener, MessageProvider, MessageVisitor};
use codec::{HeartbeatPayload, ProtocolDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use types::{
    DataIterator, DataProvider, DataRecord, MessageType, RecordVisitor, SubscriptionIterator, SubscriptionProvider,
    SubscriptionRecord,
};

/// A visitor that accepts a limited number of records and keeps them for inspection
#[derive(Debug, Default)]
pub struct CountingVisitor {
    capacity: usize,
    data: Vec<DataRecord>,
    subscriptions: Vec<SubscriptionRecord>,
    order: Vec<i32>,
}

impl CountingVisitor {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn unlimited() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Allow `capacity` more records
    pub fn reset_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub fn data_records(&self) -> usize {
        self.data.len()
    }

    pub fn subscription_records(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn data(&self) -> &[DataRecord] {
        &self.data
    }

    pub fn subscriptions(&self) -> &[SubscriptionRecord] {
        &self.subscriptions
    }

    /// Type ids in the order they were visited
    pub fn order(&self) -> &[i32] {
        &self.order
    }
}

impl RecordVisitor<DataRecord> for CountingVisitor {
    fn has_capacity(&self) -> bool {
        self.capacity > 0
    }

    fn visit_record(&mut self, record: &DataRecord) {
        self.capacity -= 1;
        self.data.push(record.clone());
    }
}

impl RecordVisitor<SubscriptionRecord> for CountingVisitor {
    fn has_capacity(&self) -> bool {
        self.capacity > 0
    }

    fn visit_record(&mut self, record: &SubscriptionRecord) {
        self.capacity -= 1;
        self.subscriptions.push(record.clone());
    }
}

impl MessageVisitor for CountingVisitor {
    fn visit_describe_protocol(&mut self, _desc: &ProtocolDescriptor) -> bool {
        self.order.push(MessageType::DescribeProtocol.id());
        false
    }

    fn visit_heartbeat(&mut self, _heartbeat: &HeartbeatPayload) -> bool {
        self.order.push(MessageType::Heartbeat.id());
        false
    }

    fn visit_data(&mut self, provider: &mut DataProvider<'_>, message: MessageType) -> bool {
        self.order.push(message.id());
        provider.retrieve(self)
    }

    fn visit_subscription(&mut self, provider: &mut SubscriptionProvider<'_>, message: MessageType) -> bool {
        self.order.push(message.id());
        provider.retrieve(self)
    }

    fn visit_other_message(&mut self, type_id: i32, _payload: &[u8]) -> bool {
        self.order.push(type_id);
        false
    }
}

/// Everything a [`RecordingConsumer`] saw, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    DescribeProtocol(ProtocolDescriptor),
    Heartbeat(HeartbeatPayload),
    Data(MessageType, Vec<DataRecord>),
    Subscription(MessageType, Vec<SubscriptionRecord>),
    Other(i32, Vec<u8>),
    CorruptedStream,
    CorruptedMessage(i32),
    UnknownMessage(i32),
}

/// A consumer that records every call for assertions
#[derive(Debug, Default)]
pub struct RecordingConsumer {
    events: Vec<ConsumerEvent>,
    recognized: Vec<i32>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `type_id` as a known custom message
    pub fn recognizing(mut self, type_id: i32) -> Self {
        self.recognized.push(type_id);
        self
    }

    pub fn events(&self) -> &[ConsumerEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ConsumerEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MessageConsumer for RecordingConsumer {
    fn handle_corrupted_stream(&mut self) {
        self.events.push(ConsumerEvent::CorruptedStream);
    }

    fn handle_corrupted_message(&mut self, type_id: i32) {
        self.events.push(ConsumerEvent::CorruptedMessage(type_id));
    }

    fn handle_unknown_message(&mut self, type_id: i32) {
        self.events.push(ConsumerEvent::UnknownMessage(type_id));
    }

    fn process_describe_protocol(&mut self, desc: &ProtocolDescriptor, _logged: bool) {
        self.events.push(ConsumerEvent::DescribeProtocol(desc.clone()));
    }

    fn process_heartbeat(&mut self, heartbeat: &HeartbeatPayload) {
        self.events.push(ConsumerEvent::Heartbeat(*heartbeat));
    }

    fn process_data(&mut self, records: &mut DataIterator<'_>, message: MessageType) {
        let records = std::iter::from_fn(|| records.next_record()).collect();
        self.events.push(ConsumerEvent::Data(message, records));
    }

    fn process_subscription(&mut self, records: &mut SubscriptionIterator<'_>, message: MessageType) {
        let records = std::iter::from_fn(|| records.next_record()).collect();
        self.events.push(ConsumerEvent::Subscription(message, records));
    }

    fn process_other_message(&mut self, type_id: i32, payload: &[u8]) -> bool {
        if !self.recognized.contains(&type_id) {
            return false;
        }
        self.events.push(ConsumerEvent::Other(type_id, payload.to_vec()));
        true
    }
}

/// A listener that counts notifications
#[derive(Debug, Default)]
pub struct RecordingListener {
    notifications: AtomicUsize,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

impl MessageListener for RecordingListener {
    fn messages_available(&self, _provider: &dyn MessageProvider) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}
