#![doc = include_str!("../README.md")]
// If this was in Cargo.toml, it would cover examples as well
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod platform_check;

#[macro_use]
mod macros;

mod c_wrappers;
mod channel;
mod control;
mod error;
mod establish;
mod pump;
mod ring;
mod wake;

pub use {
    channel::{Channel, ChannelOptions, DEFAULT_CAPACITY},
    control::State,
    error::SetupError,
};

#[cfg(test)]
#[path = "../tests/index.rs"]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests;
