use crate::handler::{ConnectionControl, ConnectionDriver};
use crate::worker::WorkerContext;
use crate::{WorkerError, WorkerResult};
use message_pump::{BinaryComposer, MessageListener, MessageProvider};
use parking_lot::Mutex;
use qtp_config::PumpConfig;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Wakes the handler thread when its provider has something to send
#[derive(Default)]
struct PumpSignal {
    available: AtomicBool,
    worker: Mutex<Option<Arc<WorkerContext>>>,
}

impl MessageListener for PumpSignal {
    fn messages_available(&self, _provider: &dyn MessageProvider) {
        self.available.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().as_ref() {
            worker.wake();
        }
    }
}

/// Sends everything a [`MessageProvider`] produces to a byte sink.
///
/// Each pass composes at most `compose_buffer_limit` bytes, writes them, and
/// retrieves again while the provider reports more. When drained, the thread
/// parks until the provider's listener fires or `idle_park` elapses.
pub struct MessagePumpDriver<W> {
    provider: Arc<dyn MessageProvider>,
    composer: BinaryComposer,
    sink: W,
    idle_park: Duration,
    signal: Arc<PumpSignal>,
}

impl<W: Write + Send + 'static> MessagePumpDriver<W> {
    pub fn new(provider: Arc<dyn MessageProvider>, sink: W, config: &PumpConfig) -> Self {
        Self {
            provider,
            composer: BinaryComposer::new(config.compose_buffer_limit),
            sink,
            idle_park: config.idle_park(),
            signal: Arc::new(PumpSignal::default()),
        }
    }

    /// Composes and writes one pass; returns whether the provider has more
    fn pump(&mut self, connection: &ConnectionControl) -> WorkerResult<bool> {
        self.signal.available.store(false, Ordering::SeqCst);
        let more = self.provider.retrieve_messages(&mut self.composer);
        if !self.composer.is_empty() {
            let messages = self.composer.message_count();
            let bytes = self.composer.take();
            self.sink.write_all(&bytes)?;
            self.sink.flush()?;
            connection.stats().record_written(bytes.len(), messages);
            trace!(connection = %connection.name(), bytes = bytes.len(), messages, "Sent");
        }
        Ok(more)
    }
}

impl<W: Write + Send + 'static> ConnectionDriver for MessagePumpDriver<W> {
    fn run(&mut self, connection: &ConnectionControl) -> WorkerResult<()> {
        *self.signal.worker.lock() = Some(connection.worker().clone());
        let listener: Arc<dyn MessageListener> = self.signal.clone();
        self.provider.set_message_listener(Some(listener));
        connection.make_connected();

        while !connection.check_closed()? {
            let more = self.pump(connection)?;
            if !more && !self.signal.available.load(Ordering::SeqCst) {
                connection.worker().park_timeout(self.idle_park);
            }
        }
        Ok(())
    }

    fn close_impl(&mut self, cause: Option<&WorkerError>) -> WorkerResult<()> {
        self.provider.set_message_listener(None);
        self.signal.worker.lock().take();
        debug!(graceful = cause.is_none(), "Pump driver closed");
        self.sink.flush()?;
        Ok(())
    }
}
