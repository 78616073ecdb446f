//! Thin wrappers around the libc calls the crate is built on, mapping their error reporting to
//! [`io::Result`].
#![allow(
    clippy::arithmetic_side_effects,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use std::{
    ffi::{c_void, OsStr},
    io,
    mem::{size_of, zeroed},
    os::{
        fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
        unix::ffi::OsStrExt,
    },
    ptr,
    time::Duration,
};

pub(crate) fn create_stream_socket(nonblocking: bool) -> io::Result<OwnedFd> {
    #[allow(unused_mut, clippy::let_and_return)]
    let ty = {
        let mut ty = libc::SOCK_STREAM;
        #[cfg(any(target_os = "linux", target_os = "android"))]
        {
            ty |= libc::SOCK_CLOEXEC;
            if nonblocking {
                ty |= libc::SOCK_NONBLOCK;
            }
        }
        ty
    };
    let (success, fd) = unsafe {
        let result = libc::socket(libc::AF_UNIX, ty, 0);
        (result != -1, result)
    };
    let fd = ok_or_errno!(success => unsafe {
        // SAFETY: we just created this descriptor
        OwnedFd::from_raw_fd(fd)
    })?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        use std::os::fd::AsFd;
        set_cloexec(fd.as_fd())?;
        if nonblocking {
            set_nonblocking(fd.as_fd(), true)?;
        }
    }
    Ok(fd)
}

/// Converts a filesystem path to a socket address, truncating it if it does not fit. The result
/// always keeps the trailing nul byte of `sun_path` intact.
pub(crate) fn socket_address(path: &OsStr) -> libc::sockaddr_un {
    let mut addr: libc::sockaddr_un = unsafe {
        // SAFETY: sockaddr_un is POD
        zeroed()
    };
    addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
    let bytes = path.as_bytes();
    let len = bytes.len().min(addr.sun_path.len() - 1);
    for (dst, src) in addr.sun_path.iter_mut().zip(bytes.iter().take(len)) {
        *dst = *src as libc::c_char;
    }
    addr
}

pub(crate) fn bind(fd: BorrowedFd<'_>, addr: &libc::sockaddr_un) -> io::Result<()> {
    let success = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            (addr as *const libc::sockaddr_un).cast(),
            size_of::<libc::sockaddr_un>() as libc::socklen_t,
        ) != -1
    };
    ok_or_errno!(success => ())
}

pub(crate) fn listen(fd: BorrowedFd<'_>, backlog: libc::c_int) -> io::Result<()> {
    let success = unsafe { libc::listen(fd.as_raw_fd(), backlog) != -1 };
    ok_or_errno!(success => ())
}

pub(crate) fn accept(fd: BorrowedFd<'_>) -> io::Result<OwnedFd> {
    let (success, conn) = unsafe {
        let result = libc::accept(fd.as_raw_fd(), ptr::null_mut(), ptr::null_mut());
        (result != -1, result)
    };
    ok_or_errno!(success => unsafe {
        // SAFETY: we just accepted this descriptor
        OwnedFd::from_raw_fd(conn)
    })
}

pub(crate) fn connect(fd: BorrowedFd<'_>, addr: &libc::sockaddr_un) -> io::Result<()> {
    let success = unsafe {
        libc::connect(
            fd.as_raw_fd(),
            (addr as *const libc::sockaddr_un).cast(),
            size_of::<libc::sockaddr_un>() as libc::socklen_t,
        ) != -1
    };
    ok_or_errno!(success => ())
}

pub(crate) fn set_nonblocking(fd: BorrowedFd<'_>, nonblocking: bool) -> io::Result<()> {
    let (old_flags, success) = unsafe {
        // SAFETY: a null pointer is, for some reason, required yet ignored for F_GETFL
        let result = libc::fcntl(fd.as_raw_fd(), libc::F_GETFL, ptr::null::<c_void>());
        (result, result != -1)
    };
    if !success {
        return Err(io::Error::last_os_error());
    }
    let new_flags = if nonblocking {
        old_flags | libc::O_NONBLOCK
    } else {
        old_flags & !libc::O_NONBLOCK
    };
    let success = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, new_flags) } != -1;
    ok_or_errno!(success => ())
}

/// Creates a pipe with both ends in non-blocking mode, returning the read end first.
pub(crate) fn pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [0 as libc::c_int; 2];
    #[cfg(any(target_os = "linux", target_os = "android"))]
    let success =
        unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) != -1 };
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    let success = unsafe { libc::pipe(fds.as_mut_ptr()) != -1 };
    let (rx, tx) = ok_or_errno!(success => unsafe {
        // SAFETY: we just created both descriptors
        (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1]))
    })?;
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        use std::os::fd::AsFd;
        for fd in [rx.as_fd(), tx.as_fd()] {
            set_cloexec(fd)?;
            set_nonblocking(fd, true)?;
        }
    }
    Ok((rx, tx))
}

pub(crate) fn read(fd: BorrowedFd<'_>, buf: &mut [u8]) -> io::Result<usize> {
    let (success, bytes_read) = unsafe {
        let size_or_err = libc::read(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len());
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_errno!(success => bytes_read)
}

pub(crate) fn write(fd: BorrowedFd<'_>, buf: &[u8]) -> io::Result<usize> {
    let (success, bytes_written) = unsafe {
        let size_or_err = libc::write(fd.as_raw_fd(), buf.as_ptr().cast(), buf.len());
        (size_or_err >= 0, size_or_err as usize)
    };
    ok_or_errno!(success => bytes_written)
}

/// Waits for readiness on the given descriptors, `None` meaning no timeout. Every `revents` field
/// is cleared first, and a wait cut short by a signal reports zero descriptors ready instead of
/// failing.
pub(crate) fn poll(fds: &mut [libc::pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    for fd in fds.iter_mut() {
        fd.revents = 0;
    }
    let timeout = match timeout {
        Some(t) => libc::c_int::try_from(t.as_millis()).unwrap_or(libc::c_int::MAX),
        None => -1,
    };
    let (success, ready) = unsafe {
        let result = libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout);
        (result != -1, result as usize)
    };
    match ok_or_errno!(success => ready) {
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
        els => els,
    }
}

/// Blocks every signal for the calling thread, leaving their delivery to the rest of the process.
pub(crate) fn block_all_signals() -> io::Result<()> {
    let mut set: libc::sigset_t = unsafe {
        // SAFETY: sigset_t is POD
        zeroed()
    };
    let success = unsafe { libc::sigfillset(&mut set) != -1 };
    ok_or_errno!(success => ())?;
    let error = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, ptr::null_mut()) };
    if error != 0 {
        return Err(io::Error::from_raw_os_error(error));
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod non_linux {
    use super::*;
    fn get_fdflags(fd: BorrowedFd<'_>) -> io::Result<libc::c_int> {
        let (val, success) = unsafe {
            let ret = libc::fcntl(fd.as_raw_fd(), libc::F_GETFD, 0);
            (ret, ret != -1)
        };
        ok_or_errno!(success => val)
    }
    fn set_fdflags(fd: BorrowedFd<'_>, flags: libc::c_int) -> io::Result<()> {
        let success = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags) != -1 };
        ok_or_errno!(success => ())
    }
    pub(super) fn set_cloexec(fd: BorrowedFd<'_>) -> io::Result<()> {
        set_fdflags(fd, get_fdflags(fd)? | libc::FD_CLOEXEC)?;
        Ok(())
    }
}
#[cfg(not(any(target_os = "linux", target_os = "android")))]
use non_linux::set_cloexec;
