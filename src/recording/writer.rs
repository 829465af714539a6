//! MP4 movie file writer

use super::encoder::H264Encoder;
use crate::errors::CameraError;
use muxide::api::{Metadata, Muxer, MuxerBuilder, VideoCodec};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Summary of a finished movie.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieStats {
    pub path: PathBuf,
    pub video_frames: u64,
    pub duration_secs: f64,
    pub bytes_written: u64,
}

/// Writes RGB frames to an MP4 file at a fixed frame rate.
pub struct MovieWriter {
    encoder: H264Encoder,
    muxer: Muxer<BufWriter<File>>,
    path: PathBuf,
    width: u32,
    height: u32,
    frame_duration: f64,
    frames: u64,
}

impl MovieWriter {
    pub fn create(path: &Path, width: u32, height: u32, fps: f64) -> Result<Self, CameraError> {
        let encoder = H264Encoder::new(width, height)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        let muxer = MuxerBuilder::new(writer)
            .video(VideoCodec::H264, width, height, fps)
            .with_fast_start(true)
            .with_metadata(Metadata::new().with_current_time())
            .build()
            .map_err(|e| CameraError::HardwareError(format!("Failed to create muxer: {}", e)))?;

        log::debug!("Movie writer opened {} ({}x{} @ {} fps)", path.display(), width, height, fps);
        Ok(Self {
            encoder,
            muxer,
            path: path.to_path_buf(),
            width,
            height,
            frame_duration: 1.0 / fps,
            frames: 0,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn write_rgb(&mut self, rgb: &[u8]) -> Result<(), CameraError> {
        let encoded = self.encoder.encode_rgb(rgb)?;
        if encoded.data.is_empty() {
            return Ok(());
        }
        let pts = self.frames as f64 * self.frame_duration;
        self.muxer
            .write_video(pts, &encoded.data, encoded.is_keyframe)
            .map_err(|e| CameraError::HardwareError(format!("Failed to write frame: {}", e)))?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(self) -> Result<MovieStats, CameraError> {
        let stats = self
            .muxer
            .finish_with_stats()
            .map_err(|e| CameraError::HardwareError(format!("Failed to finalize movie: {}", e)))?;
        log::info!(
            "Movie finished: {} ({} frames, {:.1}s)",
            self.path.display(),
            stats.video_frames,
            stats.duration_secs
        );
        Ok(MovieStats {
            path: self.path,
            video_frames: stats.video_frames,
            duration_secs: stats.duration_secs,
            bytes_written: stats.bytes_written,
        })
    }
}
