//! The non-blocking side of the interface: occupancy queries, polling the wait descriptor and
//! opportunistic receives.

use {
    crate::{c_wrappers, tests::util::*, Channel, DEFAULT_CAPACITY},
    color_eyre::eyre::{ensure, WrapErr},
    std::{
        fs,
        io::{Read, Write},
        os::{
            fd::AsRawFd,
            unix::net::UnixStream,
        },
        time::Duration,
    },
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();
    let mut server = Channel::server(&path).context("server creation failed")?;

    // queueing works before anyone connects, and occupancy tracks it
    ensure_eq!(server.buffer_space(), DEFAULT_CAPACITY);
    ensure_eq!(server.data_ready(), 0);
    server.send_all(b"early").context("pre-connect send failed")?;
    ensure_eq!(server.buffer_space(), DEFAULT_CAPACITY - 5);

    let mut raw = UnixStream::connect(&path).context("raw peer connect failed")?;
    let mut early = [0; 5];
    raw.read_exact(&mut early).context("raw peer receive failed")?;
    ensure_eq!(&early, b"early");

    raw.write_all(b"knock knock").context("raw peer send failed")?;
    while server.data_ready() < 11 {
        server.wait().context("wait failed")?;
    }
    let mut buf = [0; 32];
    let got = server.try_recv(&mut buf).context("try_recv failed")?;
    ensure_eq!(&buf[..got], b"knock knock");
    ensure_eq!(server.try_recv(&mut buf).context("repeat try_recv failed")?, 0);

    // the wait descriptor signals progress to an external poll loop
    raw.write_all(b"second round").context("second raw peer send failed")?;
    let mut fds = [libc::pollfd {
        fd: server.wait_fd().as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    }];
    c_wrappers::poll(&mut fds, Some(Duration::from_secs(5))).context("poll failed")?;
    ensure!(fds[0].revents & libc::POLLIN != 0, "wait descriptor never signaled");
    server.wait().context("post-poll wait failed")?;
    server.recv_exact(&mut buf[..12]).context("second receive failed")?;
    ensure_eq!(&buf[..12], b"second round");

    server.close().context("close failed")?;
    let _ = fs::remove_file(&path);
    Ok(())
}
