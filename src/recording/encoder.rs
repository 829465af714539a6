//! H.264 encoding via openh264

use crate::errors::CameraError;
use openh264::encoder::{Encoder, FrameType};
use openh264::formats::YUVBuffer;

/// Encodes fixed-size RGB frames.
pub struct H264Encoder {
    encoder: Encoder,
    width: u32,
    height: u32,
}

/// One encoded access unit in Annex B format.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

impl H264Encoder {
    /// Dimensions must be even; 4:2:0 subsampling halves both axes.
    pub fn new(width: u32, height: u32) -> Result<Self, CameraError> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(CameraError::InvalidArgument(format!(
                "H.264 frames need even, non-zero dimensions, got {}x{}",
                width, height
            )));
        }
        let encoder = Encoder::new()
            .map_err(|e| CameraError::HardwareError(format!("Failed to create encoder: {}", e)))?;
        Ok(Self {
            encoder,
            width,
            height,
        })
    }

    pub fn encode_rgb(&mut self, rgb: &[u8]) -> Result<EncodedFrame, CameraError> {
        let expected = (self.width * self.height * 3) as usize;
        if rgb.len() != expected {
            return Err(CameraError::HardwareError(format!(
                "Frame is {} bytes, encoder expects {}",
                rgb.len(),
                expected
            )));
        }

        let yuv = YUVBuffer::from_vec(
            rgb_to_yuv420(rgb, self.width, self.height),
            self.width as usize,
            self.height as usize,
        );
        let bitstream = self
            .encoder
            .encode(&yuv)
            .map_err(|e| CameraError::HardwareError(format!("Encoding failed: {}", e)))?;

        Ok(EncodedFrame {
            is_keyframe: matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I),
            data: bitstream.to_vec(),
        })
    }
}

/// BT.601 RGB24 to planar I420.
pub(crate) fn rgb_to_yuv420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let luma = w * h;
    let chroma = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; luma + chroma * 2];
    let (y_plane, rest) = yuv.split_at_mut(luma);
    let (u_plane, v_plane) = rest.split_at_mut(chroma);

    for row in 0..h {
        for col in 0..w {
            let i = (row * w + col) * 3;
            let (r, g, b) = (rgb[i] as i32, rgb[i + 1] as i32, rgb[i + 2] as i32);
            y_plane[row * w + col] = (((66 * r + 129 * g + 25 * b + 128) >> 8) + 16).clamp(0, 255) as u8;

            if row % 2 == 0 && col % 2 == 0 {
                let c = (row / 2) * (w / 2) + col / 2;
                u_plane[c] = (((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128).clamp(0, 255) as u8;
                v_plane[c] = (((112 * r - 94 * g - 18 * b + 128) >> 8) + 128).clamp(0, 255) as u8;
            }
        }
    }
    yuv
}
