//! The background thread that moves bytes between the socket and the rings.

use {
    crate::{
        c_wrappers,
        control::{Shared, State},
        establish,
        ring::RingBuffer,
    },
    std::{
        io,
        os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
    },
};

/// Body of a server channel's background thread. Waits for a client on `listener`, then pumps
/// the established connection until the session ends one way or another.
pub(crate) fn run_server(shared: &Shared, listener: OwnedFd) {
    if let Err(e) = c_wrappers::block_all_signals() {
        log::error!("failed to block signals on the channel thread: {e}");
        shared.change_state(State::Disconnected);
        return;
    }
    match establish::accept_with_shutdown_poll(listener.as_fd(), shared) {
        Ok(Some(conn)) => {
            // one peer per channel, nobody else gets to connect
            drop(listener);
            shared.change_state(State::Connected);
            log::debug!("peer connected");
            if let Err(e) = comm_loop(shared, conn.as_fd()) {
                log::error!("channel transport failed: {e}");
            }
        }
        Ok(None) => log::debug!("shut down before a peer connected"),
        Err(e) => log::error!("waiting for a peer failed: {e}"),
    }
    shared.change_state(State::Disconnected);
}

/// Body of a client channel's background thread. The connection was already established by the
/// constructor, so all that is left is pumping it.
pub(crate) fn run_client(shared: &Shared, conn: OwnedFd) {
    if let Err(e) = c_wrappers::block_all_signals() {
        log::error!("failed to block signals on the channel thread: {e}");
    } else if let Err(e) = comm_loop(shared, conn.as_fd()) {
        log::error!("channel transport failed: {e}");
    }
    shared.change_state(State::Disconnected);
}

/// What one nonblocking transfer attempt on the socket amounted to.
enum Transfer {
    /// Bytes moved.
    Moved,
    /// Nothing could move this round.
    Idle,
    /// The peer is gone, orderly or not.
    PeerGone,
}

/// Moves bytes between the socket and the rings until the peer leaves, shutdown completes or the
/// transport fails.
///
/// Readiness interest is recomputed from ring occupancy on every round: the socket is read only
/// while the inbound ring has room and written only while the outbound ring has data. The user
/// wake pipe sits in the same poll set so the application can force a recomputation whenever it
/// changes ring state. `Ok(())` means the session ended in an expected way; an error is a
/// transport fault the caller is expected to report.
fn comm_loop(shared: &Shared, conn: BorrowedFd<'_>) -> io::Result<()> {
    let mut done = false;
    while !done {
        let events = {
            let inner = shared.lock();
            let mut events = 0;
            if inner.inbound.available() > 0 {
                events |= libc::POLLIN;
            }
            if inner.outbound.filled() > 0 {
                events |= libc::POLLOUT;
            }
            events
        };
        let mut fds = [
            libc::pollfd { fd: conn.as_raw_fd(), events, revents: 0 },
            libc::pollfd {
                fd: shared.user_wake.as_fd().as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];
        c_wrappers::poll(&mut fds, None)?;

        let mut inner = shared.lock();
        if fds[1].revents & libc::POLLIN != 0 {
            shared.user_wake.consume()?;
        }
        let mut notify = false;
        if fds[0].revents & libc::POLLIN != 0 {
            match pull(conn, &mut inner.inbound)? {
                Transfer::Moved => notify = true,
                Transfer::Idle => {}
                Transfer::PeerGone => done = true,
            }
        }
        if fds[0].revents & libc::POLLOUT != 0 {
            match push(conn, &mut inner.outbound)? {
                Transfer::Moved => notify = true,
                Transfer::Idle => {}
                Transfer::PeerGone => done = true,
            }
        }
        if notify {
            shared.notify_progress()?;
        }
        if inner.shutdown && inner.outbound.is_empty() {
            done = true;
        }
    }
    Ok(())
}

/// Moves bytes off the socket into the inbound ring.
fn pull(conn: BorrowedFd<'_>, inbound: &mut RingBuffer) -> io::Result<Transfer> {
    let run = inbound.writable();
    if run.is_empty() {
        return Ok(Transfer::Idle);
    }
    match c_wrappers::read(conn, run) {
        Ok(0) => Ok(Transfer::PeerGone),
        Ok(n) => {
            inbound.commit(n);
            Ok(Transfer::Moved)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Transfer::Idle),
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Ok(Transfer::PeerGone),
        Err(e) => Err(e),
    }
}

/// Moves bytes from the outbound ring onto the socket.
fn push(conn: BorrowedFd<'_>, outbound: &mut RingBuffer) -> io::Result<Transfer> {
    let run = outbound.readable();
    if run.is_empty() {
        return Ok(Transfer::Idle);
    }
    match c_wrappers::write(conn, run) {
        Ok(0) => Ok(Transfer::Idle),
        Ok(n) => {
            outbound.consume(n);
            Ok(Transfer::Moved)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(Transfer::Idle),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(Transfer::PeerGone),
        Err(e) => Err(e),
    }
}
