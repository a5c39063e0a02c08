//! Connection handlers
//!
//! A [`ConnectionHandler`] is one connection run on its own [`WorkerThread`].
//! The transport-specific part is a [`ConnectionDriver`]; the handler owns
//! the state machine and the close sequence around it.

use crate::connector::ConnectorShared;
use crate::worker::{Work, WorkerContext, WorkerThread};
use crate::{ConnectionState, ConnectionStats, WorkerError, WorkerResult};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{error, info};

/// Transport logic run on a handler thread
pub trait ConnectionDriver: Send + 'static {
    /// Runs the connection until it ends or `connection` is closed
    fn run(&mut self, connection: &ConnectionControl) -> WorkerResult<()>;

    /// Releases transport resources; runs once, after the state became `Disconnected`
    fn close_impl(&mut self, cause: Option<&WorkerError>) -> WorkerResult<()>;
}

/// The part of a handler shared with its driver
pub struct ConnectionControl {
    id: u64,
    name: String,
    state: Mutex<ConnectionState>,
    stats: ConnectionStats,
    worker: Arc<WorkerContext>,
    connector: Weak<ConnectorShared>,
}

impl ConnectionControl {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    pub fn worker(&self) -> &Arc<WorkerContext> {
        &self.worker
    }

    /// See [`WorkerContext::check_closed`]
    pub fn check_closed(&self) -> WorkerResult<bool> {
        self.worker.check_closed()
    }

    /// `Connecting` → `Connected`; returns false from any other state.
    ///
    /// Connector listeners are notified after the state lock is released.
    pub fn make_connected(&self) -> bool {
        let connected = {
            let mut state = self.state.lock();
            if *state != ConnectionState::Connecting {
                false
            } else {
                *state = ConnectionState::Connected;
                true
            }
        };
        if connected {
            info!(connection = %self.name, "Connected");
            if let Some(connector) = self.connector.upgrade() {
                connector.notify_state_changed();
            }
        }
        connected
    }

    /// Moves to `Disconnected` and asks the handler thread to stop.
    ///
    /// The state changes under the same lock as [`make_connected`](Self::make_connected),
    /// so a late connect cannot win. Teardown, deregistration and notification
    /// still run once, on the handler thread.
    pub fn make_closed(&self) {
        *self.state.lock() = ConnectionState::Disconnected;
        self.worker.close();
    }
}

struct HandlerWork {
    control: Arc<ConnectionControl>,
    driver: Box<dyn ConnectionDriver>,
}

impl Work for HandlerWork {
    fn do_work(&mut self, _ctx: &Arc<WorkerContext>) -> WorkerResult<()> {
        self.driver.run(&self.control)
    }

    fn handle_shutdown(&mut self) {
        if let Some(connector) = self.control.connector.upgrade() {
            error!(connection = %self.control.name, "Stopping connector after fatal handler failure");
            connector.stop();
        }
    }

    fn handle_close(&mut self, cause: Option<&WorkerError>) {
        let control = &self.control;
        *control.state.lock() = ConnectionState::Disconnected;
        match cause {
            None => info!(connection = %control.name, "Disconnected"),
            Some(e) => info!(connection = %control.name, cause = %e, "Disconnected"),
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.driver.close_impl(cause))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(connection = %control.name, error = %e, "Connection teardown failed"),
            Err(payload) => {
                let e = WorkerError::from_panic(payload);
                error!(connection = %control.name, error = %e, "Connection teardown panicked");
            }
        }

        if let Some(connector) = control.connector.upgrade() {
            connector.handler_closed(control);
        }
    }
}

/// One connection of a [`MessageConnector`](crate::MessageConnector)
pub struct ConnectionHandler {
    control: Arc<ConnectionControl>,
    worker: WorkerThread<HandlerWork>,
}

impl ConnectionHandler {
    pub(crate) fn new(
        id: u64,
        name: String,
        driver: Box<dyn ConnectionDriver>,
        connector: Weak<ConnectorShared>,
    ) -> Self {
        let worker = Arc::new(WorkerContext::new());
        let control = Arc::new(ConnectionControl {
            id,
            name: name.clone(),
            state: Mutex::new(ConnectionState::Connecting),
            stats: ConnectionStats::new(),
            worker: worker.clone(),
            connector,
        });
        let work = HandlerWork {
            control: control.clone(),
            driver,
        };
        Self {
            control,
            worker: WorkerThread::with_context(name, worker, work),
        }
    }

    pub(crate) fn start(&self) -> WorkerResult<()> {
        self.worker.start()
    }

    pub fn id(&self) -> u64 {
        self.control.id
    }

    pub fn name(&self) -> &str {
        &self.control.name
    }

    pub fn state(&self) -> ConnectionState {
        self.control.state()
    }

    pub fn stats(&self) -> &ConnectionStats {
        &self.control.stats
    }

    pub fn control(&self) -> &ConnectionControl {
        &self.control
    }

    pub fn make_connected(&self) -> bool {
        self.control.make_connected()
    }

    /// Marks the connection `Disconnected` and asks its thread to close; the
    /// close sequence runs on that thread
    pub fn close(&self) {
        self.control.make_closed();
    }

    pub fn is_closed(&self) -> bool {
        self.worker.is_closed()
    }

    pub fn is_alive(&self) -> bool {
        self.worker.is_alive()
    }

    pub fn join(&self) {
        self.worker.join();
    }
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("id", &self.control.id)
            .field("name", &self.control.name)
            .field("state", &self.state())
            .finish()
    }
}
