use log::{debug, warn};
use std::{
    fmt,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread,
    time::Duration,
};

/// The reason why the watch was stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The process received a termination signal.
    Signal(i32),
    /// The cancellation was requested from the code.
    Requested,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Signal(signal) => write!(f, "received signal {signal}"),
            CancelReason::Requested => write!(f, "cancellation requested"),
        }
    }
}

/// The sending half, which can request the cancellation.
#[derive(Clone)]
pub struct CancelHandle(Sender<CancelReason>);

/// The receiving half, which is waited on between the polls.
pub struct Cancellation(Receiver<CancelReason>);

/// Create a connected cancellation handle and cancellation.
pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = mpsc::channel();
    (CancelHandle(tx), Cancellation(rx))
}

impl CancelHandle {
    /// Request the cancellation. Returns false if nobody listens anymore.
    pub fn cancel(&self, reason: CancelReason) -> bool {
        self.0.send(reason).is_ok()
    }
}

impl Cancellation {
    /// Wait for the timeout, or until the cancellation is requested.
    ///
    /// If every handle is dropped, it can never be cancelled, so this just sleeps.
    pub fn wait(&self, timeout: Duration) -> Option<CancelReason> {
        match self.0.recv_timeout(timeout) {
            Ok(reason) => Some(reason),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                None
            }
        }
    }
}

/// Cancel on the first termination signal, exit immediately on the second.
///
/// The first signal only takes effect when the running pull or deployment has finished.
#[cfg(unix)]
pub fn listen_for_signals(handle: CancelHandle) {
    use signal_hook::{
        consts::TERM_SIGNALS,
        iterator::{exfiltrator::SignalOnly, SignalsInfo},
    };

    match SignalsInfo::<SignalOnly>::new(TERM_SIGNALS) {
        Ok(mut signals) => {
            thread::spawn(move || forward_signals(&handle, signals.forever()));
        }
        Err(err) => warn!("Failed setting up signal handler: {err}."),
    }
}

#[cfg(not(unix))]
pub fn listen_for_signals(_handle: CancelHandle) {
    debug!("Signal handlers are not supported on non-unix systems.");
}

#[cfg_attr(not(unix), allow(dead_code))]
fn forward_signals<I>(handle: &CancelHandle, signals: I)
where
    I: IntoIterator<Item = i32>,
{
    let mut received = 0;
    for signal in signals {
        received += 1;
        if received == 1 {
            debug!("Got signal {signal}, stopping after the current check finished.");
            if !handle.cancel(CancelReason::Signal(signal)) {
                warn!("Failed stopping the watch with signal {signal}.");
            }
        } else {
            // Allow a little time for the logs to be written.
            thread::sleep(Duration::from_millis(100));
            debug!("Got signal {signal}, terminating right now.");
            std::process::exit(128 + signal);
        }
    }
}
