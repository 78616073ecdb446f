//! Control state shared between the application handle and the channel thread.

use {
    crate::{ring::RingBuffer, wake::Notifier},
    std::{
        io,
        sync::{Condvar, Mutex, MutexGuard, PoisonError},
    },
};

/// Connection state of a [`Channel`](crate::Channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No peer has shown up yet. Server channels start here and leave it when a client connects.
    /// Client channels connect during construction and never report this state.
    Waiting,
    /// The peer is attached and bytes are flowing.
    Connected,
    /// The session is over, whether by orderly shutdown, peer departure or a transport failure.
    /// Terminal.
    Disconnected,
}

pub(crate) struct Inner {
    pub state: State,
    /// Set by the application to ask the channel thread to drain outgoing bytes and exit.
    pub shutdown: bool,
    /// Bytes received from the peer, waiting to be read by the application.
    pub inbound: RingBuffer,
    /// Bytes queued by the application, waiting to go out on the socket.
    pub outbound: RingBuffer,
}

pub(crate) struct Shared {
    inner: Mutex<Inner>,
    /// Notified on every progress announcement. Blocking application calls sleep here, any
    /// number of them at once.
    progress: Condvar,
    /// Rouses the channel thread out of its readiness wait.
    pub user_wake: Notifier,
    /// Latches progress announcements for the readiness descriptor and its external poll loop.
    pub peer_wake: Notifier,
}

impl Shared {
    pub fn new(inbound_capacity: usize, outbound_capacity: usize) -> io::Result<Self> {
        Ok(Self {
            inner: Mutex::new(Inner {
                state: State::Waiting,
                shutdown: false,
                inbound: RingBuffer::new(inbound_capacity),
                outbound: RingBuffer::new(outbound_capacity),
            }),
            progress: Condvar::new(),
            user_wake: Notifier::new()?,
            peer_wake: Notifier::new()?,
        })
    }

    /// Locks the control block. A poisoned lock is taken anyway, rings and flags stay consistent
    /// across an unwind elsewhere.
    pub fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Releases the lock, sleeps until the next progress announcement and relocks. Wakes
    /// spuriously at times, callers recheck their condition in a loop.
    pub fn wait_progress<'a>(&self, guard: MutexGuard<'a, Inner>) -> MutexGuard<'a, Inner> {
        self.progress.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    /// Announces progress to every application waiter: threads parked in blocking calls through
    /// the condvar, external poll loops through the readiness pipe.
    pub fn notify_progress(&self) -> io::Result<()> {
        self.progress.notify_all();
        self.peer_wake.signal()
    }

    /// Moves the state machine and wakes application threads so they can observe the change.
    pub fn change_state(&self, state: State) {
        self.lock().state = state;
        log::debug!("channel state is now {state:?}");
        if let Err(e) = self.notify_progress() {
            log::error!("failed to announce the state change: {e}");
        }
    }
}
