//! Protocol identities: subscription contracts and canonical message types

pub mod contract;
pub mod message_type;
