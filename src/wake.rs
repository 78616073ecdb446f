//! Edge-style wakeup signals built on self-pipes.

use {
    crate::c_wrappers,
    std::{
        io,
        os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
    },
};

/// A one-way wakeup line between two threads.
///
/// A `Notifier` carries no payload. Any number of [`signal`](Self::signal) calls collapse into
/// one pending wakeup, which a single [`consume`](Self::consume) clears. The waitable end is
/// exposed through [`AsFd`] so it can sit in a `poll` set next to other descriptors.
pub(crate) struct Notifier {
    rx: OwnedFd,
    tx: OwnedFd,
}

impl Notifier {
    pub fn new() -> io::Result<Self> {
        let (rx, tx) = c_wrappers::pipe()?;
        Ok(Self { rx, tx })
    }

    /// Posts a wakeup. Finding the pipe full means a wakeup is already pending, which is just as
    /// good as posting one.
    pub fn signal(&self) -> io::Result<()> {
        loop {
            match c_wrappers::write(self.tx.as_fd(), &[0]) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Clears the pending wakeup, if any.
    pub fn consume(&self) -> io::Result<()> {
        let mut buf = [0; 64];
        loop {
            match c_wrappers::read(self.rx.as_fd(), &mut buf) {
                Ok(n) if n == buf.len() => continue,
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Blocks until a wakeup is posted, then clears it.
    pub fn wait(&self) -> io::Result<()> {
        let mut fds =
            [libc::pollfd { fd: self.rx.as_raw_fd(), events: libc::POLLIN, revents: 0 }];
        loop {
            c_wrappers::poll(&mut fds, None)?;
            if fds[0].revents != 0 {
                break;
            }
        }
        self.consume()
    }
}

impl AsFd for Notifier {
    /// Borrows the waitable end.
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.rx.as_fd()
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("rx", &self.rx).field("tx", &self.tx).finish()
    }
}
