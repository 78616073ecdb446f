//! Bytes pushed through rings much smaller than the payload come out intact and in order.
//!
//! The peer here is a plain blocking `UnixStream`, so this also checks that the wire carries
//! nothing but the raw bytes.

use {
    crate::{tests::util::*, ChannelOptions},
    color_eyre::eyre::{ensure, eyre, WrapErr},
    std::{
        fs,
        io::{Read, Write},
        os::unix::net::UnixStream,
        thread,
    },
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();
    let mut server = ChannelOptions::new()
        .inbound_capacity(1024)
        .outbound_capacity(1024)
        .server(&path)
        .context("server creation failed")?;

    let mut raw = UnixStream::connect(&path).context("raw peer connect failed")?;
    let echo = thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut seen = vec![0; 4096];
        raw.read_exact(&mut seen)?;
        raw.write_all(&seen)?;
        Ok(seen)
    });

    let mut rng = Xorshift32::from_id(id);
    let outgoing: Vec<u8> = (0..4096).map(|_| rng.next_byte()).collect();
    server.send_all(&outgoing).context("bulk send failed")?;

    let mut returned = vec![0; outgoing.len()];
    server.recv_exact(&mut returned).context("bulk receive failed")?;
    ensure!(returned == outgoing, "payload came back different");

    let seen = echo.join().map_err(|_| eyre!("echo thread panicked"))??;
    ensure!(seen == outgoing, "raw peer saw a different payload");

    server.close().context("server close failed")?;
    let _ = fs::remove_file(&path);
    Ok(())
}
