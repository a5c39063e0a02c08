//! # Channel Shaper
//!
//! Binds `{contract, filters, executor}` to exactly one agent channel, the
//! external endpoint that routes subscription for a contract.
//!
//! ```text
//! SubscriptionFilter ──snapshot──▶ ChannelShaper ──reconfigure_if_needed──▶ AgentChannel
//!        │ update                        ▲
//!        └──────── FilterUpdateListener ─┘   (DynamicChannelShaper only)
//! ```
//!
//! A plain [`ChannelShaper`] holds whatever filter it was last given. A
//! [`DynamicChannelShaper`] owns one evolving filter for its whole lifetime
//! and re-applies it on every update notification.

pub mod channel;
pub mod dynamic;
pub mod error;
pub mod filter;
pub mod shaper;

pub use channel::{AgentChannel, InlineExecutor, SubscriptionExecutor, SubscriptionTask};
pub use dynamic::DynamicChannelShaper;
pub use error::{ShaperError, ShaperResult};
pub use filter::{
    AnyFilter, DynamicFilter, FilterUpdateListener, RecordFilter, StaticFilter, SubscriptionFilter, SymbolSetFilter,
};
pub use shaper::{ChannelShaper, MAX_AGGREGATION_PERIOD, MAX_WEIGHT, MIN_WEIGHT};
