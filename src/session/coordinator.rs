//! Capture and recording coordination: busy-flag guards, in-flight
//! bookkeeping, output naming and photo encoding.

use crate::errors::CameraError;
use crate::mirror::StateMirror;
use crate::platform::PhotoData;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

pub(crate) type Reply<T> = oneshot::Sender<Result<T, CameraError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusyFlag {
    Capturing,
    Recording,
}

/// Clears its flag in the mirror when dropped, whichever way the operation
/// ended.
pub(crate) struct BusyRelease {
    mirror: Arc<StateMirror>,
    flag: BusyFlag,
}

impl BusyRelease {
    /// Raise the flag now and clear it on drop.
    pub(crate) fn acquire(mirror: &Arc<StateMirror>, flag: BusyFlag) -> Self {
        mirror.update(|s| set_flag(s, flag, true));
        Self {
            mirror: mirror.clone(),
            flag,
        }
    }

    /// Take over a flag that is already raised.
    pub(crate) fn adopt(mirror: &Arc<StateMirror>, flag: BusyFlag) -> Self {
        Self {
            mirror: mirror.clone(),
            flag,
        }
    }
}

impl Drop for BusyRelease {
    fn drop(&mut self) {
        let flag = self.flag;
        self.mirror.update(|s| set_flag(s, flag, false));
    }
}

fn set_flag(state: &mut crate::types::CameraState, flag: BusyFlag, value: bool) {
    match flag {
        BusyFlag::Capturing => state.capturing = value,
        BusyFlag::Recording => state.recording = value,
    }
}

/// The one hardware round-trip currently awaiting its callback.
pub(crate) enum InFlight {
    Picture {
        reply: Reply<PathBuf>,
        release: BusyRelease,
    },
    StartRecording {
        reply: Reply<()>,
        path: PathBuf,
        /// Set when the movie output died before the start was confirmed.
        interrupted: Option<CameraError>,
    },
    StopRecording {
        reply: Reply<PathBuf>,
        release: BusyRelease,
    },
}

impl InFlight {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            InFlight::Picture { .. } => "take_picture",
            InFlight::StartRecording { .. } => "start_video_recording",
            InFlight::StopRecording { .. } => "stop_video_recording",
        }
    }
}

/// Hardware callback results routed back onto the session actor.
pub(crate) enum Completion {
    Picture(Result<Option<PhotoData>, CameraError>),
    RecordingStarted(Result<(), CameraError>),
    RecordingStopped(Result<PathBuf, CameraError>),
}

/// Unique capture file names: `<prefix>_<utc millis>_<sequence>.<ext>`.
pub(crate) struct OutputNamer {
    directory: PathBuf,
    photo_prefix: String,
    video_prefix: String,
    sequence: AtomicU64,
}

impl OutputNamer {
    pub(crate) fn new(directory: PathBuf, photo_prefix: String, video_prefix: String) -> Self {
        Self {
            directory,
            photo_prefix,
            video_prefix,
            sequence: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_photo(&self) -> PathBuf {
        self.next(&self.photo_prefix, "jpg")
    }

    pub(crate) fn next_video(&self) -> PathBuf {
        self.next(&self.video_prefix, "mp4")
    }

    fn next(&self, prefix: &str, extension: &str) -> PathBuf {
        loop {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let name = format!(
                "{}_{}_{:04}.{}",
                prefix,
                chrono::Utc::now().timestamp_millis(),
                sequence,
                extension
            );
            let path = self.directory.join(name);
            if !path.exists() {
                return path;
            }
        }
    }
}

/// Write the captured image as a JPEG at `path`.
pub(crate) fn write_photo(data: PhotoData, path: &Path, quality: u8) -> Result<(), CameraError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match data {
        PhotoData::Jpeg(bytes) => {
            if bytes.is_empty() {
                return Err(empty_capture());
            }
            std::fs::write(path, bytes)?;
        }
        PhotoData::Rgb {
            width,
            height,
            data,
        } => {
            let img = image::RgbImage::from_vec(width, height, data).ok_or_else(|| {
                CameraError::CaptureError(format!(
                    "Frame buffer does not match {}x{} RGB",
                    width, height
                ))
            })?;
            let writer = BufWriter::new(File::create(path)?);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
            image::DynamicImage::ImageRgb8(img).write_with_encoder(encoder)?;
        }
    }
    log::info!("Photo written to {}", path.display());
    Ok(())
}

fn empty_capture() -> CameraError {
    CameraError::CaptureError("capture completed without image data".to_string())
}

/// Hardware failures during capture surface as `CaptureError`; a success
/// without a buffer is a failure too.
pub(crate) fn photo_payload(
    result: Result<Option<PhotoData>, CameraError>,
) -> Result<PhotoData, CameraError> {
    match result {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(empty_capture()),
        Err(CameraError::CaptureError(msg)) => Err(CameraError::CaptureError(msg)),
        Err(other) => Err(CameraError::CaptureError(other.to_string())),
    }
}
