use crate::frame::{frame_overhead, write_data_record, write_frame, write_subscription_record};
use crate::MessageVisitor;
use bytes::Bytes;
use codec::{BufferedOutput, HeartbeatPayload, ProtocolDescriptor};
use tracing::trace;
use types::{DataProvider, DataRecord, MessageType, RecordVisitor, SubscriptionProvider, SubscriptionRecord};

/// Frames visited messages into a byte buffer of bounded size.
///
/// Once `limit` bytes are composed, record visits stop accepting and report
/// "more remains", which leaves the rest pending in the provider. A message
/// is never split; a single record larger than the limit still goes out
/// alone in an otherwise empty buffer.
#[derive(Debug)]
pub struct BinaryComposer {
    out: BufferedOutput,
    body: BufferedOutput,
    limit: usize,
    messages: usize,
}

/// Writes records into a message body while the composer has room
struct BodyWriter<'a> {
    body: &'a mut BufferedOutput,
    count: i32,
    budget: usize,
}

impl BodyWriter<'_> {
    fn has_room(&self) -> bool {
        self.count == 0 || self.body.len() < self.budget
    }
}

impl RecordVisitor<DataRecord> for BodyWriter<'_> {
    fn has_capacity(&self) -> bool {
        self.has_room()
    }

    fn visit_record(&mut self, record: &DataRecord) {
        write_data_record(self.body, record);
        self.count += 1;
    }
}

impl RecordVisitor<SubscriptionRecord> for BodyWriter<'_> {
    fn has_capacity(&self) -> bool {
        self.has_room()
    }

    fn visit_record(&mut self, record: &SubscriptionRecord) {
        write_subscription_record(self.body, record);
        self.count += 1;
    }
}

impl BinaryComposer {
    pub fn new(limit: usize) -> Self {
        Self {
            out: BufferedOutput::with_capacity(limit),
            body: BufferedOutput::new(),
            limit,
            messages: 0,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Whether another record message may be started
    pub fn has_capacity(&self) -> bool {
        self.out.len() < self.limit
    }

    /// Messages composed since the last [`take`](Self::take)
    pub fn message_count(&self) -> usize {
        self.messages
    }

    pub fn as_slice(&self) -> &[u8] {
        self.out.as_slice()
    }

    /// Takes the composed bytes, leaving the composer empty
    pub fn take(&mut self) -> Bytes {
        self.messages = 0;
        self.out.split().freeze()
    }

    fn write_message(&mut self, type_id: i32, payload: &[u8]) {
        write_frame(&mut self.out, type_id, payload);
        self.messages += 1;
    }

    fn body_budget(&self, message: MessageType) -> usize {
        let left = self.limit.saturating_sub(self.out.len());
        left.saturating_sub(frame_overhead(message.id(), left) + 5)
    }

    fn visit_records(&mut self, message: MessageType, retrieve: impl FnOnce(&mut BodyWriter<'_>) -> bool) -> bool {
        // An empty composer always takes at least one record
        if !self.out.is_empty() && !self.has_capacity() {
            return true;
        }
        let budget = self.body_budget(message);
        if budget == 0 && !self.out.is_empty() {
            return true;
        }
        self.body.clear();
        let mut writer = BodyWriter {
            body: &mut self.body,
            count: 0,
            budget,
        };
        let more = retrieve(&mut writer);
        let count = writer.count;
        if count == 0 {
            return more;
        }
        let mut payload = BufferedOutput::with_capacity(self.body.len() + 5);
        payload.write_compact_int(count);
        payload.write_bytes(self.body.as_slice());
        self.write_message(message.id(), payload.as_slice());
        trace!(message = %message, count, bytes = self.out.len(), "Composed records");
        more
    }
}

impl MessageVisitor for BinaryComposer {
    fn visit_describe_protocol(&mut self, desc: &ProtocolDescriptor) -> bool {
        self.body.clear();
        desc.compose_to(&mut self.body);
        let body = self.body.split();
        self.write_message(MessageType::DescribeProtocol.id(), &body);
        false
    }

    fn visit_heartbeat(&mut self, heartbeat: &HeartbeatPayload) -> bool {
        self.body.clear();
        heartbeat.compose_to(&mut self.body);
        let body = self.body.split();
        self.write_message(MessageType::Heartbeat.id(), &body);
        false
    }

    fn visit_data(&mut self, provider: &mut DataProvider<'_>, message: MessageType) -> bool {
        self.visit_records(message, |writer| provider.retrieve(writer))
    }

    fn visit_subscription(&mut self, provider: &mut SubscriptionProvider<'_>, message: MessageType) -> bool {
        self.visit_records(message, |writer| provider.retrieve(writer))
    }

    fn visit_other_message(&mut self, type_id: i32, payload: &[u8]) -> bool {
        if !self.out.is_empty() && !self.has_capacity() {
            return true;
        }
        self.write_message(type_id, payload);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::RecordBuffer;

    fn records(n: usize) -> RecordBuffer<DataRecord> {
        (0..n).map(|i| DataRecord::new(1, format!("S{i:04}"), vec![i as i32, 100])).collect()
    }

    #[test]
    fn test_limit_applies_backpressure() {
        let mut composer = BinaryComposer::new(64);
        let mut provider = records(50);

        let mut passes = 0;
        loop {
            let more = composer.visit_data(&mut provider, MessageType::TickerData);
            assert!(composer.len() <= 64 + 16, "composed {} bytes", composer.len());
            composer.take();
            passes += 1;
            if !more {
                break;
            }
            assert!(passes < 50, "no progress");
        }
        assert!(passes > 1);
        assert!(provider.is_empty());
    }

    #[test]
    fn test_full_composer_takes_nothing() {
        let mut composer = BinaryComposer::new(8);
        composer.visit_other_message(100, &[0; 16]);
        assert_eq!(composer.message_count(), 1);
        let mut provider = records(1);
        assert!(composer.visit_data(&mut provider, MessageType::TickerData));
        assert_eq!(provider.len(), 1);
        assert!(composer.visit_other_message(101, &[1]));
        assert_eq!(composer.message_count(), 1);
        composer.take();
        assert_eq!(composer.message_count(), 0);
    }

    #[test]
    fn test_zero_limit_still_makes_progress() {
        let mut composer = BinaryComposer::new(0);
        let mut provider = records(3);

        let mut passes = 0;
        while composer.visit_data(&mut provider, MessageType::TickerData) {
            assert_eq!(composer.message_count(), 1);
            composer.take();
            passes += 1;
            assert!(passes < 3, "no progress");
        }
        assert_eq!(passes, 2);
        assert!(provider.is_empty());
    }

    #[test]
    fn test_empty_provider_writes_no_frame() {
        let mut composer = BinaryComposer::new(1024);
        let mut provider = RecordBuffer::<DataRecord>::new();
        assert!(!composer.visit_data(&mut provider, MessageType::StreamData));
        assert!(composer.is_empty());
    }
}
