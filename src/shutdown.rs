//! Process signals that end a worker in an orderly way
//!
//! Both Ctrl-C and SIGTERM (sent by service managers and container runtimes)
//! stop the dispatch loop, after which buffered results are flushed.

use std::fmt;
use std::io;

/// Which signal asked the worker to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => f.write_str("Ctrl-C"),
            Self::Terminate => f.write_str("SIGTERM"),
        }
    }
}

/// Listener for the signals that request shutdown
///
/// Handlers are installed by [`ShutdownSignal::listen`], not on first poll, so
/// a signal arriving between startup and the first await is not lost.
pub struct ShutdownSignal {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    /// Installs the signal handlers; must be called inside a tokio runtime
    pub fn listen() -> io::Result<Self> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    /// Waits for the first shutdown request
    pub async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = wait_for_interrupt() => ShutdownReason::Interrupt,
            _ = self.wait_for_terminate() => ShutdownReason::Terminate,
        }
    }

    #[cfg(unix)]
    async fn wait_for_terminate(&mut self) {
        if self.terminate.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }

    #[cfg(not(unix))]
    async fn wait_for_terminate(&mut self) {
        std::future::pending::<()>().await
    }
}

async fn wait_for_interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_requests_shutdown() {
        let mut signal = ShutdownSignal::listen().unwrap();

        let status = std::process::Command::new("kill")
            .arg("-TERM")
            .arg(std::process::id().to_string())
            .status()
            .unwrap();
        assert!(status.success());

        let reason = tokio::time::timeout(Duration::from_secs(5), signal.recv())
            .await
            .expect("SIGTERM was not observed");
        assert_eq!(reason, ShutdownReason::Terminate);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(ShutdownReason::Interrupt.to_string(), "Ctrl-C");
        assert_eq!(ShutdownReason::Terminate.to_string(), "SIGTERM");
    }
}
