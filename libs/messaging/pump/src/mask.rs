use std::sync::atomic::{AtomicU64, Ordering};
use types::MessageType;

/// Bit used for every type id without a dedicated bit
const OVERFLOW_BIT: u32 = 63;

/// Lock-free set of message type ids with pending data
#[derive(Debug, Default)]
pub struct MessageMask {
    bits: AtomicU64,
}

impl MessageMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bit for a wire type id; ids outside `0..63` share the last bit
    pub fn bit(type_id: i32) -> u64 {
        match u32::try_from(type_id) {
            Ok(id) if id < OVERFLOW_BIT => 1 << id,
            _ => 1 << OVERFLOW_BIT,
        }
    }

    /// Marks `type_id` pending; returns `true` if nothing at all was pending before
    pub fn add(&self, type_id: i32) -> bool {
        self.add_bits(Self::bit(type_id)) == 0
    }

    /// Ors `bits` in, returning the previous mask
    pub fn add_bits(&self, bits: u64) -> u64 {
        self.bits.fetch_or(bits, Ordering::AcqRel)
    }

    pub fn has(&self, type_id: i32) -> bool {
        self.bits.load(Ordering::Acquire) & Self::bit(type_id) != 0
    }

    pub fn clear(&self, type_id: i32) {
        self.bits.fetch_and(!Self::bit(type_id), Ordering::AcqRel);
    }

    pub fn is_empty(&self) -> bool {
        self.bits.load(Ordering::Acquire) == 0
    }

    /// Takes the whole mask, leaving it empty
    pub fn retrieve(&self) -> u64 {
        self.bits.swap(0, Ordering::AcqRel)
    }

    /// Canonical message types present in `bits`, in id order
    pub fn types_in(bits: u64) -> impl Iterator<Item = MessageType> {
        MessageType::ALL
            .into_iter()
            .filter(move |t| bits & Self::bit(t.id()) != 0)
    }
}
