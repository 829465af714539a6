//! Derived capability ranges for a bound device.

use crate::types::{AspectRatio, CameraDevice, ExposureRange, ZoomRange};

/// Resolved capabilities of the active device.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    pub zoom: ZoomRange,
    pub exposure: ExposureRange,
    pub aspect_ratios: Vec<AspectRatio>,
}

impl Capabilities {
    /// Preferred aspect ratio reported in the snapshot: the first one the
    /// device listed.
    pub fn primary_aspect_ratio(&self) -> Option<AspectRatio> {
        self.aspect_ratios.first().copied()
    }
}

/// Combine the descriptor with the hardware's live range reports.
pub fn resolve(
    device: &CameraDevice,
    zoom_report: Option<ZoomRange>,
    exposure_report: Option<ExposureRange>,
) -> Capabilities {
    Capabilities {
        zoom: sanitize_zoom(zoom_report),
        exposure: sanitize_exposure(exposure_report),
        aspect_ratios: device.supported_aspect_ratios.clone(),
    }
}

/// Missing, inverted, non-finite or non-positive ranges fall back to
/// `{1, 1, 1}`. A valid range with a stray current value is clamped.
pub fn sanitize_zoom(report: Option<ZoomRange>) -> ZoomRange {
    let Some(range) = report else {
        return ZoomRange::FALLBACK;
    };
    let finite = range.min.is_finite() && range.max.is_finite();
    if !finite || range.min <= 0.0 || range.min > range.max {
        log::debug!("Discarding invalid zoom report {:?}", range);
        return ZoomRange::FALLBACK;
    }
    let current = if range.current.is_finite() {
        range.current.clamp(range.min, range.max)
    } else {
        range.min
    };
    ZoomRange {
        min: range.min,
        max: range.max,
        current,
    }
}

pub fn sanitize_exposure(report: Option<ExposureRange>) -> ExposureRange {
    match report {
        Some(r) if r.min.is_finite() && r.max.is_finite() && r.min <= r.max => r,
        _ => ExposureRange::default(),
    }
}

/// Reduce every `(width, height)` by its GCD and keep the first occurrence of
/// each ratio. The result is in encounter order, not sorted.
pub fn reduce_aspect_ratios(formats: &[(u32, u32)]) -> Vec<AspectRatio> {
    let mut ratios: Vec<AspectRatio> = Vec::new();
    for &(width, height) in formats {
        if width == 0 || height == 0 {
            continue;
        }
        let divisor = gcd(width, height);
        let ratio = AspectRatio {
            width: width / divisor,
            height: height / divisor,
        };
        if !ratios.contains(&ratio) {
            ratios.push(ratio);
        }
    }
    ratios
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}
