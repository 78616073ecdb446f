//! The channel notices its peer leaving and winds the session down cleanly.

use {
    crate::{tests::util::*, Channel, State},
    color_eyre::eyre::{bail, ensure, WrapErr},
    std::{fs, io, io::Write, os::unix::net::UnixStream},
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();
    let mut server = Channel::server(&path).context("server creation failed")?;

    let mut raw = UnixStream::connect(&path).context("raw peer connect failed")?;
    raw.write_all(b"parting gift").context("raw peer send failed")?;
    drop(raw);

    // bytes sent before the peer left still arrive
    let mut buf = [0; 12];
    server.recv_exact(&mut buf).context("receive failed")?;
    ensure_eq!(&buf, b"parting gift");

    ensure_eq!(server.recv(&mut buf).context("trailing receive failed")?, 0);
    ensure_eq!(server.state(), State::Disconnected);
    ensure!(!server.is_open(), "channel still claims to be open");

    // sending into the void is an error, not a hang
    let err = match server.send(b"anyone?") {
        Err(e) => e,
        Ok(_) => bail!("send succeeded with no peer"),
    };
    ensure_eq!(err.kind(), io::ErrorKind::BrokenPipe);

    server.close().context("close failed")?;
    let _ = fs::remove_file(&path);
    Ok(())
}
