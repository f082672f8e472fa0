//! SimplePad: a small plain-text notepad for the terminal.
//!
//! The editing core ([`session`], [`document`], [`status`]) talks to the
//! outside world only through the traits in [`platform`]. Saving goes
//! through one [`persistence`] strategy chosen at start-up, and the help
//! and about screens are served through the offline cache in [`worker`].

pub mod cli;
pub mod config;
pub mod document;
pub mod log;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod status;
pub mod ui;
pub mod worker;

#[cfg(test)]
mod testing;
