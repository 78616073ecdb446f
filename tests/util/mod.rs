//! Shared plumbing for the test suite.
#![allow(dead_code, unused_macros)]

#[macro_use]
mod eyre;
mod xorshift;

#[allow(unused_imports)]
pub use {eyre::*, namegen::*, xorshift::*};

/// Installs the pretty error reporter, once per test binary.
pub fn testinit() {
    eyre::install();
}
