//! The public channel handle and its construction.

use {
    crate::{
        control::{Shared, State},
        establish,
        error::SetupError,
        pump,
        ring::RingBuffer,
    },
    std::{
        fmt, io,
        os::fd::{AsFd, BorrowedFd},
        path::Path,
        sync::Arc,
        thread::{self, JoinHandle},
    },
};

/// Ring capacity used when [`ChannelOptions`] does not override it.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Configuration for a [`Channel`] under construction.
#[derive(Clone, Copy, Debug)]
pub struct ChannelOptions {
    inbound_capacity: usize,
    outbound_capacity: usize,
}

/// Creation.
impl ChannelOptions {
    /// Creates an options table with default values.
    #[inline]
    pub fn new() -> Self {
        Self { inbound_capacity: DEFAULT_CAPACITY, outbound_capacity: DEFAULT_CAPACITY }
    }
}

/// Option setters.
impl ChannelOptions {
    /// Sets the capacity of the ring that buffers bytes arriving from the peer.
    ///
    /// The default value is [`DEFAULT_CAPACITY`].
    #[inline]
    #[must_use]
    pub fn inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }
    /// Sets the capacity of the ring that buffers bytes on their way to the peer.
    ///
    /// The default value is [`DEFAULT_CAPACITY`].
    #[inline]
    #[must_use]
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }
}

/// Channel constructors.
impl ChannelOptions {
    /// Creates the server end of a channel at the given socket path and starts its background
    /// thread.
    ///
    /// The call returns right away, with the channel in the [`Waiting`](State::Waiting) state
    /// until a client connects. A leftover socket file at `path` is removed first.
    ///
    /// # System calls
    /// - `unlink`
    /// - `socket`
    /// - `bind`
    /// - `listen`
    pub fn server(self, path: impl AsRef<Path>) -> Result<Channel, SetupError> {
        self.validate()?;
        let shared = Arc::new(
            Shared::new(self.inbound_capacity, self.outbound_capacity)
                .map_err(SetupError::Notifier)?,
        );
        let listener = establish::listen(path.as_ref())?;
        let thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("sockchan-server".into())
                .spawn(move || pump::run_server(&shared, listener))
                .map_err(SetupError::Spawn)?
        };
        Ok(Channel { shared, thread: Some(thread) })
    }

    /// Creates the client end of a channel, connecting to the server socket at the given path,
    /// and starts its background thread.
    ///
    /// The call blocks for as long as no server is listening at `path`, retrying every 100 ms,
    /// and the returned channel is already in the [`Connected`](State::Connected) state.
    ///
    /// # System calls
    /// - `socket`
    /// - `connect`
    pub fn client(self, path: impl AsRef<Path>) -> Result<Channel, SetupError> {
        self.validate()?;
        let shared = Arc::new(
            Shared::new(self.inbound_capacity, self.outbound_capacity)
                .map_err(SetupError::Notifier)?,
        );
        let conn = establish::connect_with_retry(path.as_ref())?;
        shared.change_state(State::Connected);
        let thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("sockchan-client".into())
                .spawn(move || pump::run_client(&shared, conn))
                .map_err(SetupError::Spawn)?
        };
        Ok(Channel { shared, thread: Some(thread) })
    }

    fn validate(self) -> Result<(), SetupError> {
        if self.inbound_capacity == 0 || self.outbound_capacity == 0 {
            return Err(SetupError::InvalidCapacity);
        }
        Ok(())
    }
}

impl Default for ChannelOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// One end of a byte channel between two local processes.
///
/// A channel couples a pair of in-memory byte rings to a Unix domain socket connection. A
/// background thread owns the connection and moves bytes in both directions, so every method
/// here works purely on the rings and comes back quickly unless it is documented to block.
/// Handles are freely shareable across threads behind a reference, all methods take `&self`
/// except [`close`](Self::close). Any number of threads may sit in [`recv`](Self::recv) and
/// [`send`](Self::send) at once; [`wait`](Self::wait) and [`wait_fd`](Self::wait_fd) are a
/// single readiness line meant for one event loop.
///
/// Dropping the channel shuts it down: queued outgoing bytes are flushed to the peer first,
/// then the connection is closed and the background thread reaped.
pub struct Channel {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

/// Constructors.
impl Channel {
    /// Creates the server end of a channel with default options. See
    /// [`ChannelOptions::server`].
    #[inline]
    pub fn server(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        ChannelOptions::new().server(path)
    }
    /// Creates the client end of a channel with default options. See
    /// [`ChannelOptions::client`].
    #[inline]
    pub fn client(path: impl AsRef<Path>) -> Result<Self, SetupError> {
        ChannelOptions::new().client(path)
    }
}

/// Receiving.
impl Channel {
    /// Receives bytes from the peer, blocking while there are none.
    ///
    /// Returns how many bytes were moved into `buf`, possibly fewer than fit. `Ok(0)` is
    /// returned only for an empty `buf` or at end of stream, that is, once the session is over
    /// and everything the peer ever sent has been consumed.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut inner = self.shared.lock();
        while inner.inbound.is_empty() {
            if inner.state == State::Disconnected {
                return Ok(0);
            }
            inner = self.shared.wait_progress(inner);
        }
        let n = copy_out(&mut inner.inbound, buf);
        // freed ring space, let the pump re-arm its read interest
        self.shared.user_wake.signal()?;
        Ok(n)
    }

    /// Receives whatever is available right now without blocking, `Ok(0)` if nothing is.
    pub fn try_recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.shared.lock();
        let n = copy_out(&mut inner.inbound, buf);
        if n > 0 {
            self.shared.user_wake.signal()?;
        }
        Ok(n)
    }

    /// Receives exactly `buf.len()` bytes, blocking as long as it takes.
    ///
    /// # Errors
    /// [`UnexpectedEof`](io::ErrorKind::UnexpectedEof) if the stream ends first, with the bytes
    /// received so far sitting in an unspecified prefix of `buf`.
    pub fn recv_exact(&self, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.recv(buf)? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "channel closed before the read completed",
                    ))
                }
                n => {
                    let taken = buf;
                    buf = taken.split_at_mut(n).1;
                }
            }
        }
        Ok(())
    }
}

/// Sending.
impl Channel {
    /// Queues bytes for delivery to the peer, blocking while there is no room for any.
    ///
    /// Returns how many bytes were taken from `buf`, at least one. Bytes are taken even while a
    /// server channel is still waiting for its client, they go out once the connection is up.
    ///
    /// # Errors
    /// [`BrokenPipe`](io::ErrorKind::BrokenPipe) once the session is over, in which case none of
    /// `buf` was taken.
    pub fn send(&self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut inner = self.shared.lock();
        loop {
            if inner.state == State::Disconnected {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "channel peer is gone"));
            }
            if inner.outbound.free() > 0 {
                break;
            }
            inner = self.shared.wait_progress(inner);
        }
        let n = copy_in(&mut inner.outbound, buf);
        self.shared.user_wake.signal()?;
        Ok(n)
    }

    /// Queues all of `buf`, blocking as long as it takes.
    pub fn send_all(&self, buf: &[u8]) -> io::Result<()> {
        let mut rest = buf;
        while !rest.is_empty() {
            let n = self.send(rest)?;
            let (_, tail) = rest.split_at(n);
            rest = tail;
        }
        Ok(())
    }
}

/// Introspection and lifecycle.
impl Channel {
    /// Number of received bytes ready to be taken without blocking.
    #[inline]
    pub fn data_ready(&self) -> usize {
        self.shared.lock().inbound.len()
    }
    /// Number of bytes [`send`](Self::send) would take without blocking.
    #[inline]
    pub fn buffer_space(&self) -> usize {
        self.shared.lock().outbound.free()
    }
    /// Current connection state.
    #[inline]
    pub fn state(&self) -> State {
        self.shared.lock().state
    }
    /// Whether the session can still make progress. A waiting server channel counts as open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state() != State::Disconnected
    }

    /// Blocks until the channel makes progress of any kind: bytes arriving, outgoing room
    /// freeing up or the state changing.
    ///
    /// Announcements latch, so a wait that begins after progress was made returns at once. The
    /// latch is a single line: have one event loop call this, and leave concurrent byte traffic
    /// to [`recv`](Self::recv) and [`send`](Self::send) on other threads.
    pub fn wait(&self) -> io::Result<()> {
        self.shared.peer_wake.wait()
    }

    /// Borrows a descriptor that becomes readable whenever the channel makes progress, for
    /// embedding the channel in an external readiness loop.
    ///
    /// Do not read from it directly. Once it is readable, call [`wait`](Self::wait), which also
    /// clears the readiness, and take whatever the channel has with the usual methods.
    #[inline]
    pub fn wait_fd(&self) -> BorrowedFd<'_> {
        self.shared.peer_wake.as_fd()
    }

    /// Shuts the channel down: flushes queued outgoing bytes to the peer, closes the connection
    /// and reaps the background thread. Repeated calls are no-ops.
    ///
    /// This is also what dropping the channel does, minus the chance to see the error.
    pub fn close(&mut self) -> io::Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        self.shared.lock().shutdown = true;
        if let Err(e) = self.shared.user_wake.signal() {
            // without the wakeup the thread may never notice the request, joining could hang
            self.thread = Some(thread);
            return Err(e);
        }
        thread.join().map_err(|_| io::Error::other("channel thread panicked"))
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::error!("failed to shut the channel down cleanly: {e}");
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.lock();
        f.debug_struct("Channel")
            .field("state", &inner.state)
            .field("data_ready", &inner.inbound.len())
            .field("buffer_space", &inner.outbound.free())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
fn copy_out(ring: &mut RingBuffer, buf: &mut [u8]) -> usize {
    let mut copied = 0;
    while copied < buf.len() {
        let run = ring.readable();
        if run.is_empty() {
            break;
        }
        let n = run.len().min(buf.len() - copied);
        buf[copied..copied + n].copy_from_slice(&run[..n]);
        ring.consume(n);
        copied += n;
    }
    copied
}

#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
fn copy_in(ring: &mut RingBuffer, buf: &[u8]) -> usize {
    let mut copied = 0;
    while copied < buf.len() {
        let run = ring.writable();
        if run.is_empty() {
            break;
        }
        let n = run.len().min(buf.len() - copied);
        run[..n].copy_from_slice(&buf[copied..copied + n]);
        ring.commit(n);
        copied += n;
    }
    copied
}
