//! Testing utilities for CrabLens
//!
//! Simulated camera hardware for driving the controller without devices.

pub mod mock;

pub use mock::{sample_photo, MockDevice, MockRig};
