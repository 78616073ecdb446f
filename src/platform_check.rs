//! Bails out of compilation early on platforms the crate cannot work on.

#[cfg(not(unix))]
compile_error!(
    "\
sockchan is built on Unix domain sockets, poll(2) and self-pipes, none of which exist on this \
platform"
);
