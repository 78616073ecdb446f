//! A client keeps knocking until the server shows up.

use {
    crate::{tests::util::*, Channel},
    color_eyre::eyre::{ensure, eyre, WrapErr},
    std::{
        fs, thread,
        time::{Duration, Instant},
    },
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();

    let server_path = path.clone();
    let server = thread::spawn(move || -> TestResult {
        thread::sleep(Duration::from_millis(300));
        let mut server = Channel::server(&server_path).context("server creation failed")?;
        server.send_all(b"better late than never").context("server send failed")?;
        let mut buf = [0; 2];
        server.recv_exact(&mut buf).context("server receive failed")?;
        ensure_eq!(&buf, b"ok");
        server.close().context("server close failed")?;
        Ok(())
    });

    let start = Instant::now();
    let mut client = Channel::client(&path).context("client connection failed")?;
    let waited = start.elapsed();
    ensure!(
        waited >= Duration::from_millis(200),
        "client connected after {waited:?}, before the server could have come up"
    );

    let mut buf = [0; 22];
    client.recv_exact(&mut buf).context("client receive failed")?;
    ensure_eq!(&buf, b"better late than never");
    client.send_all(b"ok").context("client send failed")?;
    client.close().context("client close failed")?;

    server.join().map_err(|_| eyre!("server thread panicked"))??;
    let _ = fs::remove_file(&path);
    Ok(())
}
