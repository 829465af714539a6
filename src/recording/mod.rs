//! Movie output for the native backend.
//!
//! Frames arrive as packed RGB, are encoded to H.264 with openh264 and muxed
//! into MP4 with muxide.

mod encoder;
mod writer;

pub use encoder::{EncodedFrame, H264Encoder};
pub use writer::{MovieStats, MovieWriter};
