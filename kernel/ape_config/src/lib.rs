//! Configuration constants shared by the APE NC-SI crates.
//!
//! This crate holds no code, only `const` items grouped by the subsystem that consumes them.

#![no_std]

pub mod ethernet;
pub mod ncsi;
pub mod wait;
