//! Dedicated worker threads with cooperative cancellation
//!
//! A worker keeps its own `closed` flag next to an interruption signal.
//! Interruption wakes the thread from [`WorkerContext::park_timeout`], but
//! code running inside the loop may swallow it
//! ([`WorkerContext::clear_interrupted`]); the `closed` flag can only be set
//! and is the single source of truth for "stop now".

use crate::{WorkerError, WorkerResult};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Cancellation state shared between a worker thread and its owners
#[derive(Debug, Default)]
pub struct WorkerContext {
    closed: AtomicBool,
    interrupted: AtomicBool,
    thread: Mutex<Option<Thread>>,
}

impl WorkerContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn attach(&self, thread: Thread) {
        *self.thread.lock() = Some(thread);
    }

    /// Marks the worker closed and interrupts it; safe from any thread, including its own
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.interrupt();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.wake();
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Clears the interruption signal, returning whether it was raised
    pub fn clear_interrupted(&self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }

    /// Unparks the worker without interrupting it
    pub fn wake(&self) {
        if let Some(thread) = self.thread.lock().as_ref() {
            thread.unpark();
        }
    }

    /// Run loop check: `Ok(true)` when the worker must stop.
    ///
    /// A raised interruption is consumed. Without `closed` set it is a hard
    /// failure: somebody interrupted the worker for no reason we honor.
    pub fn check_closed(&self) -> WorkerResult<bool> {
        if self.clear_interrupted() {
            if self.is_closed() {
                return Ok(true);
            }
            return Err(WorkerError::Interrupted);
        }
        Ok(self.is_closed())
    }

    /// Parks the calling thread for at most `timeout`; returns early on interrupt or wake
    pub fn park_timeout(&self, timeout: Duration) {
        if self.is_interrupted() {
            return;
        }
        thread::park_timeout(timeout);
    }
}

/// The body of a worker thread
pub trait Work: Send + 'static {
    /// Runs until finished, failed, or closed
    fn do_work(&mut self, ctx: &Arc<WorkerContext>) -> WorkerResult<()>;

    /// Best-effort "stop everything" after the run loop died fatally
    fn handle_shutdown(&mut self) {}

    /// Called exactly once when the thread exits; `None` means graceful
    fn handle_close(&mut self, cause: Option<&WorkerError>);
}

/// A named platform thread running one [`Work`].
///
/// [`close`](Self::close) may be called before [`start`](Self::start); the
/// work then observes `closed` on its first check.
pub struct WorkerThread<W: Work> {
    name: String,
    ctx: Arc<WorkerContext>,
    work: Mutex<Option<W>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<W: Work> WorkerThread<W> {
    pub fn new(name: impl Into<String>, work: W) -> Self {
        Self::with_context(name, Arc::new(WorkerContext::new()), work)
    }

    /// A worker whose cancellation state is already shared with `work`
    pub fn with_context(name: impl Into<String>, ctx: Arc<WorkerContext>, work: W) -> Self {
        Self {
            name: name.into(),
            ctx,
            work: Mutex::new(Some(work)),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.ctx
    }

    pub fn start(&self) -> WorkerResult<()> {
        let work = self
            .work
            .lock()
            .take()
            .ok_or_else(|| WorkerError::AlreadyStarted(self.name.clone()))?;
        let ctx = self.ctx.clone();
        let name = self.name.clone();
        let handle = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || run(name, ctx, work))?;
        *self.handle.lock() = Some(handle);
        Ok(())
    }

    pub fn close(&self) {
        self.ctx.close();
    }

    pub fn is_closed(&self) -> bool {
        self.ctx.is_closed()
    }

    pub fn is_alive(&self) -> bool {
        self.handle.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Waits for the thread to exit; no-op if it never started or was already joined
    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                warn!(worker = %self.name, "Worker cannot join itself");
                *self.handle.lock() = Some(handle);
                return;
            }
            if handle.join().is_err() {
                error!(worker = %self.name, "Worker thread terminated abnormally");
            }
        }
    }
}

fn run<W: Work>(name: String, ctx: Arc<WorkerContext>, mut work: W) {
    ctx.attach(thread::current());
    debug!(worker = %name, "Worker started");

    let cause = match panic::catch_unwind(AssertUnwindSafe(|| work.do_work(&ctx))) {
        Ok(Ok(())) => None,
        Ok(Err(WorkerError::Interrupted)) if ctx.is_closed() => None,
        Ok(Err(e)) => Some(e),
        Err(payload) => {
            let e = WorkerError::from_panic(payload);
            error!(worker = %name, error = %e, "Worker died, shutting down");
            if panic::catch_unwind(AssertUnwindSafe(|| work.handle_shutdown())).is_err() {
                error!(worker = %name, "Shutdown handler panicked");
            }
            Some(e)
        }
    };

    match &cause {
        None => debug!(worker = %name, "Worker finished"),
        Some(e) if !e.is_fatal() => warn!(worker = %name, error = %e, "Worker stopped"),
        Some(_) => {}
    }
    if panic::catch_unwind(AssertUnwindSafe(|| work.handle_close(cause.as_ref()))).is_err() {
        error!(worker = %name, "Close handler panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Probe {
        iterations: AtomicUsize,
        closes: AtomicUsize,
        shutdowns: AtomicUsize,
        graceful: AtomicBool,
    }

    struct Looping {
        probe: Arc<Probe>,
        panic_after: Option<usize>,
    }

    impl Work for Looping {
        fn do_work(&mut self, ctx: &Arc<WorkerContext>) -> WorkerResult<()> {
            while !ctx.check_closed()? {
                let n = self.probe.iterations.fetch_add(1, Ordering::SeqCst);
                if self.panic_after == Some(n) {
                    panic!("boom");
                }
                ctx.park_timeout(Duration::from_millis(10));
            }
            Ok(())
        }

        fn handle_shutdown(&mut self) {
            self.probe.shutdowns.fetch_add(1, Ordering::SeqCst);
        }

        fn handle_close(&mut self, cause: Option<&WorkerError>) {
            self.probe.graceful.store(cause.is_none(), Ordering::SeqCst);
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn worker(panic_after: Option<usize>) -> (WorkerThread<Looping>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let work = Looping {
            probe: probe.clone(),
            panic_after,
        };
        (WorkerThread::new("test-worker", work), probe)
    }

    #[test]
    fn test_check_closed_rules() {
        let ctx = WorkerContext::new();
        assert!(!ctx.check_closed().unwrap());

        ctx.interrupt();
        assert!(matches!(ctx.check_closed(), Err(WorkerError::Interrupted)));
        assert!(!ctx.is_interrupted());

        ctx.close();
        assert!(ctx.check_closed().unwrap());
        assert!(!ctx.is_interrupted());

        // Swallowed interruption still leaves the worker closed
        ctx.interrupt();
        ctx.clear_interrupted();
        assert!(ctx.check_closed().unwrap());
    }

    #[test]
    fn test_close_before_start() {
        let (worker, probe) = worker(None);
        worker.close();
        worker.close();
        worker.start().unwrap();
        worker.join();

        assert_eq!(probe.iterations.load(Ordering::SeqCst), 0);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert!(probe.graceful.load(Ordering::SeqCst));
        assert!(!worker.is_alive());
    }

    #[test]
    fn test_close_running_worker() {
        let (worker, probe) = worker(None);
        worker.start().unwrap();
        while probe.iterations.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        worker.close();
        worker.join();

        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert!(probe.graceful.load(Ordering::SeqCst));
        assert!(matches!(worker.start(), Err(WorkerError::AlreadyStarted(_))));
    }

    #[test]
    fn test_panic_runs_shutdown_then_close() {
        let (worker, probe) = worker(Some(0));
        worker.start().unwrap();
        worker.join();

        assert_eq!(probe.shutdowns.load(Ordering::SeqCst), 1);
        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert!(!probe.graceful.load(Ordering::SeqCst));
    }

    #[test]
    fn test_foreign_interrupt_is_a_failure() {
        let (worker, probe) = worker(None);
        worker.start().unwrap();
        while probe.iterations.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        worker.context().interrupt();
        worker.join();

        assert_eq!(probe.closes.load(Ordering::SeqCst), 1);
        assert!(!probe.graceful.load(Ordering::SeqCst));
        assert_eq!(probe.shutdowns.load(Ordering::SeqCst), 0);
    }
}
