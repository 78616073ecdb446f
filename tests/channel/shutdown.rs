//! A server channel that never sees a client shuts down promptly when asked.

use {
    crate::{tests::util::*, Channel, State},
    color_eyre::eyre::{ensure, WrapErr},
    std::{
        fs,
        time::{Duration, Instant},
    },
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();
    let mut server = Channel::server(&path).context("server creation failed")?;
    ensure_eq!(server.state(), State::Waiting);

    let start = Instant::now();
    server.close().context("close failed")?;
    let elapsed = start.elapsed();

    ensure_eq!(server.state(), State::Disconnected);
    // the accept loop checks for shutdown requests every 100 ms, this leaves generous slack
    ensure!(elapsed < Duration::from_secs(2), "close took {elapsed:?}");

    let _ = fs::remove_file(&path);
    Ok(())
}
