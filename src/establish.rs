//! Connection establishment for both channel roles.

use {
    crate::{c_wrappers, control::Shared, error::SetupError},
    std::{
        fs, io,
        os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd},
        path::Path,
        thread,
        time::Duration,
    },
};

/// How long a client sleeps between connection attempts. Also paces the listener's shutdown
/// checks while it waits for a client to show up.
pub(crate) const CONNECT_DELAY: Duration = Duration::from_millis(100);

/// Binds a fresh listener to `path`, clearing a leftover socket file out of the way first.
pub(crate) fn listen(path: &Path) -> Result<OwnedFd, SetupError> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(SetupError::RemoveStale { path: path.to_owned(), source: e }),
    }
    let socket = c_wrappers::create_stream_socket(true).map_err(SetupError::CreateSocket)?;
    let addr = c_wrappers::socket_address(path.as_os_str());
    c_wrappers::bind(socket.as_fd(), &addr)
        .map_err(|e| SetupError::Bind { path: path.to_owned(), source: e })?;
    // one channel, one peer
    c_wrappers::listen(socket.as_fd(), 1).map_err(SetupError::Listen)?;
    Ok(socket)
}

/// Waits for one inbound connection, checking for a shutdown request between poll rounds.
///
/// Returns `Ok(None)` if shutdown was requested before anyone connected. The accepted connection
/// comes back already switched to nonblocking mode.
pub(crate) fn accept_with_shutdown_poll(
    listener: BorrowedFd<'_>,
    shared: &Shared,
) -> Result<Option<OwnedFd>, SetupError> {
    let mut fds = [libc::pollfd { fd: listener.as_raw_fd(), events: libc::POLLIN, revents: 0 }];
    let conn = loop {
        c_wrappers::poll(&mut fds, Some(CONNECT_DELAY)).map_err(SetupError::Poll)?;
        if shared.lock().shutdown {
            return Ok(None);
        }
        if fds[0].revents & libc::POLLIN == 0 {
            continue;
        }
        match c_wrappers::accept(listener) {
            Ok(conn) => break conn,
            // the connection that woke us up may have evaporated again
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SetupError::Accept(e)),
        }
    };
    c_wrappers::set_nonblocking(conn.as_fd(), true).map_err(SetupError::SetNonblocking)?;
    Ok(Some(conn))
}

/// Connects to the server at `path`, retrying for as long as nobody is listening there.
///
/// A missing socket file and a refused connection both mean the server has not arrived yet and
/// are retried after [`CONNECT_DELAY`]. Anything else is reported. The established connection
/// comes back already switched to nonblocking mode.
pub(crate) fn connect_with_retry(path: &Path) -> Result<OwnedFd, SetupError> {
    let socket = c_wrappers::create_stream_socket(false).map_err(SetupError::CreateSocket)?;
    let addr = c_wrappers::socket_address(path.as_os_str());
    loop {
        match c_wrappers::connect(socket.as_fd(), &addr) {
            Ok(()) => break,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
                ) =>
            {
                thread::sleep(CONNECT_DELAY)
            }
            Err(e) => return Err(SetupError::Connect { path: path.to_owned(), source: e }),
        }
    }
    c_wrappers::set_nonblocking(socket.as_fd(), true).map_err(SetupError::SetNonblocking)?;
    Ok(socket)
}
