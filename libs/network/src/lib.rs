//! # QTP Connection Lifecycle
//!
//! One dedicated platform thread per connection:
//!
//! ```text
//! MessageConnector ──start_handler(driver)──▶ ConnectionHandler ──▶ WorkerThread
//!        ▲                                         │ make_connected / close
//!        └──── deregister, fold stats, notify ─────┘
//! ```
//!
//! ## Failure Model
//!
//! - `close()` is the only cancellation primitive; it is idempotent and may
//!   be called from any thread, including the handler's own
//! - A run loop that panics is a fatal death: the connector is asked to stop
//!   before the close sequence runs
//! - Teardown failures are logged and never skip deregistration or listener
//!   notification

pub mod connector;
pub mod error;
pub mod handler;
pub mod pump_driver;
pub mod state;
pub mod stats;
pub mod worker;

pub use connector::{MessageConnector, MessageConnectorListener};
pub use error::{WorkerError, WorkerResult};
pub use handler::{ConnectionControl, ConnectionDriver, ConnectionHandler};
pub use pump_driver::MessagePumpDriver;
pub use state::ConnectionState;
pub use stats::{ConnectionStats, EndpointStats, StatsSnapshot};
pub use worker::{Work, WorkerContext, WorkerThread};
