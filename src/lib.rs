//! campipe library crate.
//!
//! Camera capture pipeline: a background thread crops and converts device
//! frames and publishes the latest one to a render loop running at its own
//! rate. The binary in `main.rs` is a headless preview on top of it.

pub mod camera;
pub mod config;
pub mod layout;
pub mod preview;
