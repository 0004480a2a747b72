//! Termination signal trapping.
//!
//! Once installed, SIGINT/SIGTERM/SIGHUP no longer kill the process. The first
//! signal cancels a token the orchestrator watches; the orchestrator then takes
//! the abort or fatal path depending on the phase it has reached. Later signals
//! are logged and ignored so cleanup can finish.

use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Signal that interrupted the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP
    Hangup,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => f.write_str("SIGINT"),
            TerminationSignal::Terminate => f.write_str("SIGTERM"),
            TerminationSignal::Hangup => f.write_str("SIGHUP"),
        }
    }
}

/// Routes termination signals into a cancellation token
#[derive(Debug)]
pub struct SignalBridge {
    token: CancellationToken,
    received: Arc<OnceLock<TerminationSignal>>,
    listener: Option<JoinHandle<()>>,
}

impl SignalBridge {
    /// Bridge with no OS listener; interrupts only arrive through [`SignalBridge::trigger`]
    pub fn detached() -> Self {
        Self {
            token: CancellationToken::new(),
            received: Arc::new(OnceLock::new()),
            listener: None,
        }
    }

    /// Install OS signal listeners. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        let mut bridge = Self::detached();
        let token = bridge.token.clone();
        let received = bridge.received.clone();

        #[cfg(unix)]
        let listener = {
            use tokio::signal::unix::{SignalKind, signal};
            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;
            let mut hangup = signal(SignalKind::hangup())?;

            tokio::spawn(async move {
                loop {
                    let sig = tokio::select! {
                        Some(()) = interrupt.recv() => TerminationSignal::Interrupt,
                        Some(()) = terminate.recv() => TerminationSignal::Terminate,
                        Some(()) = hangup.recv() => TerminationSignal::Hangup,
                        else => break,
                    };
                    deliver(&token, &received, sig);
                }
            })
        };

        #[cfg(not(unix))]
        let listener = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                deliver(&token, &received, TerminationSignal::Interrupt);
            }
        });

        bridge.listener = Some(listener);
        log::debug!("termination signals trapped");
        Ok(bridge)
    }

    /// Token cancelled by the first signal
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Deliver a signal as if the OS had sent it
    pub fn trigger(&self, signal: TerminationSignal) {
        deliver(&self.token, &self.received, signal);
    }

    /// First signal received, if any
    pub fn received(&self) -> Option<TerminationSignal> {
        self.received.get().copied()
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

fn deliver(token: &CancellationToken, received: &OnceLock<TerminationSignal>, signal: TerminationSignal) {
    if received.set(signal).is_ok() {
        log::warn!("received {}, stopping after the current step", signal);
        token.cancel();
    } else {
        log::warn!("received {} while already shutting down; ignored", signal);
    }
}
