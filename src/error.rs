use {
    std::{io, path::PathBuf},
    thiserror::Error,
};

/// Errors that can arise while bringing a [`Channel`](crate::Channel) up.
///
/// Once a channel is established, transport failures are not reported through this type. They
/// terminate the background thread and surface to the application as the `Disconnected` state,
/// end-of-stream on receive and `BrokenPipe` on send.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A ring capacity of zero was requested.
    #[error("ring capacity must be nonzero")]
    InvalidCapacity,
    /// A leftover socket file could not be removed before binding.
    #[error("failed to remove stale socket file {}", .path.display())]
    RemoveStale {
        /// Path of the offending file.
        path: PathBuf,
        /// Error returned by the removal.
        #[source]
        source: io::Error,
    },
    /// The socket could not be created.
    #[error("failed to create socket")]
    CreateSocket(#[source] io::Error),
    /// The listener socket could not be bound to its path.
    #[error("failed to bind to {}", .path.display())]
    Bind {
        /// Path the socket was to be bound to.
        path: PathBuf,
        /// Error returned by the bind call.
        #[source]
        source: io::Error,
    },
    /// The bound socket could not be switched to listening mode.
    #[error("failed to listen")]
    Listen(#[source] io::Error),
    /// Waiting for an incoming connection failed.
    #[error("failed to poll for an incoming connection")]
    Poll(#[source] io::Error),
    /// An incoming connection could not be accepted.
    #[error("failed to accept a connection")]
    Accept(#[source] io::Error),
    /// The connection attempt failed with an error that a retry cannot fix.
    #[error("failed to connect to {}", .path.display())]
    Connect {
        /// Path of the server's socket.
        path: PathBuf,
        /// Error returned by the connect call.
        #[source]
        source: io::Error,
    },
    /// The established connection could not be made non-blocking.
    #[error("failed to set the connection to nonblocking mode")]
    SetNonblocking(#[source] io::Error),
    /// A wakeup pipe could not be created.
    #[error("failed to create a wakeup pipe")]
    Notifier(#[source] io::Error),
    /// The background thread could not be spawned.
    #[error("failed to spawn the channel thread")]
    Spawn(#[source] io::Error),
}
