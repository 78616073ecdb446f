//! Closing a channel delivers everything still queued before the connection goes down.

use {
    crate::{tests::util::*, Channel, ChannelOptions, State},
    color_eyre::eyre::{ensure, WrapErr},
    std::fs,
};

pub fn run(id: &'static str) -> TestResult {
    let path = NameGen::new(id).next().unwrap();
    let mut server = Channel::server(&path).context("server creation failed")?;
    // an outbound ring much smaller than the payload forces many flush rounds
    let mut client = ChannelOptions::new()
        .outbound_capacity(512)
        .client(&path)
        .context("client connection failed")?;

    let mut rng = Xorshift32::from_id(id);
    let payload: Vec<u8> = (0..8192).map(|_| rng.next_byte()).collect();
    client.send_all(&payload).context("bulk send failed")?;
    client.close().context("client close failed")?;

    let mut received = vec![0; payload.len()];
    server.recv_exact(&mut received).context("bulk receive failed")?;
    ensure!(received == payload, "received payload differs from what was sent");

    // nothing follows the payload but a clean end of stream
    let mut one = [0; 1];
    ensure_eq!(server.recv(&mut one).context("trailing receive failed")?, 0);
    ensure_eq!(server.state(), State::Disconnected);

    server.close().context("server close failed")?;
    let _ = fs::remove_file(&path);
    Ok(())
}
