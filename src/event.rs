use std::io::{self, BufRead, BufReader};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    /// One line of user input, without the trailing newline.
    Line(String),
    Tick,
    /// The input stream reached EOF.
    InputClosed,
}

/// Merges user input and clock ticks into one stream.
pub struct EventHandler {
    rx: mpsc::Receiver<AppEvent>,
    tx: mpsc::Sender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel();
        let input_tx = tx.clone();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else { break };
                if input_tx.send(AppEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = input_tx.send(AppEvent::InputClosed);
        });

        Self { rx, tx }
    }

    /// Sender for other event sources, such as a [`Ticker`].
    pub fn sender(&self) -> mpsc::Sender<AppEvent> {
        self.tx.clone()
    }

    pub fn next(&self) -> anyhow::Result<AppEvent> {
        Ok(self.rx.recv()?)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodic tick bound to one exam attempt.
///
/// Suspending only silences ticks; the thread keeps its schedule so resuming
/// picks up where it left off. Stopping (or dropping) always joins the
/// thread.
pub struct Ticker {
    suspended: Arc<AtomicBool>,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn spawn(interval: Duration, tx: mpsc::Sender<AppEvent>) -> Self {
        let suspended = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_suspended = Arc::clone(&suspended);

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if thread_suspended.load(Ordering::Acquire) {
                            continue;
                        }
                        if tx.send(AppEvent::Tick).is_err() {
                            return;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        });

        Self {
            suspended,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
    }

    pub fn resume(&self) {
        self.suspended.store(false, Ordering::Release);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread immediately.
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
