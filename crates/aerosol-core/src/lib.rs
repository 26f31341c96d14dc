//! Hardware-independent acquisition core for aerosol and gas instruments
//!
//! This crate contains the parts of an instrument driver that do not touch
//! hardware: time-weighted averaging of samples into fixed reporting
//! intervals, cyclic scheduling of instrument states such as impactor cut
//! sizes, and the configuration types that feed them.
//!
//! It is `#![no_std]` with `extern crate alloc` so it runs on embedded targets
//! as well as desktop hosts (for the simulator and tests). Time is always
//! passed in explicitly as seconds since the epoch; see [`clock`].

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod average;
pub mod clock;
pub mod config;
pub mod cut_size;
pub mod interval;
pub mod schedule;

mod math;

pub use average::{AverageRecord, AverageResult, Handle};
pub use cut_size::{CutSize, Size};
pub use schedule::{Active, ActivationHandler, Schedule};
