//! Connector core
//!
//! A [`MessageConnector`] owns the handlers of one endpoint, folds the stats
//! of closed connections and tells [`MessageConnectorListener`]s whenever a
//! connection connects or closes. Transports create drivers and hand them to
//! [`MessageConnector::start_handler`].

use crate::handler::{ConnectionControl, ConnectionDriver, ConnectionHandler};
use crate::{EndpointStats, WorkerError, WorkerResult};
use parking_lot::Mutex;
use qtp_config::ConnectorConfig;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Told about connection state changes of a connector
pub trait MessageConnectorListener: Send + Sync {
    fn state_changed(&self, connector: &MessageConnector);
}

pub(crate) struct ConnectorShared {
    config: ConnectorConfig,
    accepting: AtomicBool,
    handlers: Mutex<BTreeMap<u64, Arc<ConnectionHandler>>>,
    closed_stats: Mutex<EndpointStats>,
    listeners: Mutex<Vec<Arc<dyn MessageConnectorListener>>>,
    restarting: AtomicBool,
    next_id: AtomicU64,
}

impl ConnectorShared {
    /// Calls every listener in registration order; a panicking listener is logged and skipped
    pub(crate) fn notify_state_changed(self: &Arc<Self>) {
        if self.restarting.load(Ordering::SeqCst) {
            return;
        }
        let listeners = self.listeners.lock().clone();
        let connector = MessageConnector { shared: self.clone() };
        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener.state_changed(&connector))) {
                let e = WorkerError::from_panic(payload);
                error!(connector = %self.config.name, error = %e, "Connector listener failed");
            }
        }
    }

    /// Close sequence tail: deregister, fold stats, then notify
    pub(crate) fn handler_closed(self: &Arc<Self>, control: &ConnectionControl) {
        self.handlers.lock().remove(&control.id());
        self.closed_stats.lock().fold_closed(control.stats().snapshot());
        debug!(connector = %self.config.name, connection = %control.name(), "Connection deregistered");
        self.notify_state_changed();
    }

    pub(crate) fn stop(&self) {
        let handlers: Vec<_> = self.handlers.lock().values().cloned().collect();
        for handler in handlers {
            handler.close();
        }
    }
}

/// Shared handle to a connector; clones refer to the same connector
#[derive(Clone)]
pub struct MessageConnector {
    shared: Arc<ConnectorShared>,
}

impl MessageConnector {
    pub fn new(config: ConnectorConfig) -> Self {
        Self {
            shared: Arc::new(ConnectorShared {
                accepting: AtomicBool::new(config.accepting),
                config,
                handlers: Mutex::new(BTreeMap::new()),
                closed_stats: Mutex::new(EndpointStats::default()),
                listeners: Mutex::new(Vec::new()),
                restarting: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.shared.config
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn set_accepting(&self, accepting: bool) {
        self.shared.accepting.store(accepting, Ordering::SeqCst);
    }

    pub fn add_listener(&self, listener: Arc<dyn MessageConnectorListener>) {
        self.shared.listeners.lock().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn MessageConnectorListener>) {
        self.shared.listeners.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Registers a handler for `driver` and starts its thread
    pub fn start_handler(&self, driver: Box<dyn ConnectionDriver>) -> WorkerResult<Arc<ConnectionHandler>> {
        let config = &self.shared.config;
        let handler = {
            let mut handlers = self.shared.handlers.lock();
            if !self.is_accepting() {
                return Err(self.rejected("not accepting connections"));
            }
            if handlers.len() >= config.max_connections {
                return Err(self.rejected(format!("limit of {} connections reached", config.max_connections)));
            }
            let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
            let name = format!("{}-{}-{}", config.thread_name_prefix, config.name, id);
            let handler = Arc::new(ConnectionHandler::new(id, name, driver, Arc::downgrade(&self.shared)));
            handlers.insert(id, handler.clone());
            handler
        };
        if let Err(e) = handler.start() {
            self.shared.handlers.lock().remove(&handler.id());
            return Err(e);
        }
        debug!(connector = %config.name, connection = %handler.name(), "Handler started");
        Ok(handler)
    }

    fn rejected(&self, reason: impl Into<String>) -> WorkerError {
        WorkerError::Rejected {
            connector: self.shared.config.name.clone(),
            reason: reason.into(),
        }
    }

    /// Registered handlers, oldest first
    pub fn handlers(&self) -> Vec<Arc<ConnectionHandler>> {
        self.shared.handlers.lock().values().cloned().collect()
    }

    /// Asks every handler to close; does not wait
    pub fn stop(&self) {
        info!(connector = %self.name(), "Stopping connector");
        self.shared.stop();
    }

    /// Closes every handler and waits for their threads to finish
    pub fn stop_and_wait(&self) {
        let handlers = self.handlers();
        self.stop();
        for handler in handlers {
            handler.join();
        }
    }

    /// Replaces all connections with handlers for `drivers`.
    ///
    /// Listeners hear about the restart once, after the new handlers started,
    /// instead of once per closed connection.
    pub fn restart(&self, drivers: Vec<Box<dyn ConnectionDriver>>) -> WorkerResult<Vec<Arc<ConnectionHandler>>> {
        info!(connector = %self.name(), "Restarting connector");
        self.shared.restarting.store(true, Ordering::SeqCst);
        self.stop_and_wait();
        let started: WorkerResult<Vec<_>> = drivers.into_iter().map(|d| self.start_handler(d)).collect();
        self.shared.restarting.store(false, Ordering::SeqCst);
        self.shared.notify_state_changed();
        started
    }

    /// Closes the configured share of active connections, oldest first, returning how many
    pub fn close_gracefully(&self) -> usize {
        let handlers = self.handlers();
        let percentage = usize::from(self.shared.config.graceful_close_percentage.min(100));
        let count = (handlers.len() * percentage).div_ceil(100);
        for handler in handlers.iter().take(count) {
            handler.close();
        }
        info!(connector = %self.name(), closed = count, "Graceful close");
        count
    }

    pub fn active_connection_count(&self) -> usize {
        self.shared.handlers.lock().len()
    }

    pub fn closed_connection_count(&self) -> u64 {
        self.shared.closed_stats.lock().closed_connections
    }

    /// Closed-connection aggregate plus the current counters of every active connection
    pub fn retrieve_complete_endpoint_stats(&self) -> EndpointStats {
        let mut stats = *self.shared.closed_stats.lock();
        for handler in self.handlers() {
            stats.add_active(handler.stats().snapshot());
        }
        stats
    }

    pub fn reset_endpoint_stats(&self) {
        self.shared.closed_stats.lock().reset();
        for handler in self.handlers() {
            handler.stats().reset();
        }
    }
}

impl std::fmt::Debug for MessageConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageConnector")
            .field("name", &self.name())
            .field("active", &self.active_connection_count())
            .field("closed", &self.closed_connection_count())
            .finish()
    }
}
