//! Fuzz-style tests using proptest
//!
//! These provide fuzz-like testing without requiring nightly Rust or cargo-fuzz.
//! Run with: cargo test --test fuzz_tests --features recording

use proptest::prelude::*;

mod capability_fuzz {
    use super::*;
    use crablens::capability::{reduce_aspect_ratios, sanitize_exposure, sanitize_zoom};
    use crablens::{ExposureRange, ZoomRange};

    fn any_f64() -> impl Strategy<Value = f64> {
        prop_oneof![
            -100.0f64..100.0,
            Just(0.0),
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        /// Whatever the hardware reports, the published range is ordered
        #[test]
        fn fuzz_zoom_report_always_ordered(
            min in any_f64(),
            max in any_f64(),
            current in any_f64(),
        ) {
            let range = sanitize_zoom(Some(ZoomRange { min, max, current }));
            prop_assert!(range.is_ordered(), "unordered {:?}", range);
        }

        /// Clamping a sanitized range never leaves it
        #[test]
        fn fuzz_zoom_clamp_stays_in_range(
            min in 0.1f64..5.0,
            span in 0.0f64..20.0,
            request in -50.0f64..50.0,
        ) {
            let range = sanitize_zoom(Some(ZoomRange { min, max: min + span, current: min }));
            let applied = range.clamp(request);
            prop_assert!(applied >= range.min && applied <= range.max);
        }

        #[test]
        fn fuzz_exposure_report(min in any_f64(), max in any_f64()) {
            let range = sanitize_exposure(Some(ExposureRange { min, max }));
            prop_assert!(range.min <= range.max);
            prop_assert!(range.min.is_finite() && range.max.is_finite());
        }

        /// Reduced ratios are coprime and unique
        #[test]
        fn fuzz_aspect_ratio_reduction(
            formats in prop::collection::vec((0u32..8000, 0u32..8000), 0..20),
        ) {
            let ratios = reduce_aspect_ratios(&formats);
            for (i, r) in ratios.iter().enumerate() {
                prop_assert!(r.width > 0 && r.height > 0);
                prop_assert_eq!(gcd(r.width, r.height), 1);
                prop_assert!(!ratios[i + 1..].contains(r));
            }
        }
    }

    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }
}

mod selection_fuzz {
    use super::*;
    use crablens::catalog::select_from;
    use crablens::{AspectRatio, CameraDevice, DeviceKind, DeviceSelector, LensDirection};

    fn kind() -> impl Strategy<Value = DeviceKind> {
        prop_oneof![
            Just(DeviceKind::WideAngle),
            Just(DeviceKind::UltraWide),
            Just(DeviceKind::Telephoto),
            Just(DeviceKind::TrueDepth),
            Just(DeviceKind::VirtualDual),
            Just(DeviceKind::VirtualDualWide),
            Just(DeviceKind::VirtualTriple),
            Just(DeviceKind::Unknown),
        ]
    }

    fn direction() -> impl Strategy<Value = LensDirection> {
        prop_oneof![Just(LensDirection::Front), Just(LensDirection::Back)]
    }

    fn devices() -> impl Strategy<Value = Vec<CameraDevice>> {
        prop::collection::vec((kind(), direction()), 0..8).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (device_kind, lens_direction))| CameraDevice {
                    id: format!("cam-{}", i),
                    display_name: format!("Camera {}", i),
                    lens_direction,
                    sensor_orientation_degrees: 0,
                    has_flash: false,
                    has_torch: false,
                    device_kind,
                    supported_aspect_ratios: vec![AspectRatio { width: 4, height: 3 }],
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// A selection always faces the requested direction, and with
        /// `prefer_physical` is virtual only when nothing else faces it
        #[test]
        fn fuzz_direction_selection(
            devices in devices(),
            wanted in direction(),
            prefer_physical in any::<bool>(),
        ) {
            let facing: Vec<&CameraDevice> =
                devices.iter().filter(|d| d.lens_direction == wanted).collect();
            match select_from(&devices, &DeviceSelector::direction(wanted), prefer_physical) {
                Ok(chosen) => {
                    prop_assert_eq!(chosen.lens_direction, wanted);
                    if prefer_physical && chosen.device_kind.is_virtual() {
                        prop_assert!(facing.iter().all(|d| d.device_kind.is_virtual()));
                    }
                    if !prefer_physical {
                        prop_assert_eq!(&chosen.id, &facing[0].id);
                    }
                }
                Err(e) => {
                    prop_assert!(facing.is_empty());
                    prop_assert_eq!(e.code(), "deviceNotFound");
                }
            }
        }
    }
}

mod controller_fuzz {
    use super::*;
    use crablens::testing::MockRig;
    use crablens::{DeviceSelector, InitializeParams, LensDirection};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// The zoom actually applied matches the published snapshot and the
        /// hardware, whatever the request
        #[test]
        fn fuzz_set_zoom_level(requests in prop::collection::vec(-5.0f64..25.0, 1..6)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let rig = MockRig::phone();
                let controller = rig.controller(Default::default());
                controller
                    .initialize(
                        InitializeParams::new(DeviceSelector::id("back-triple", LensDirection::Back))
                            .with_anti_macro(false),
                    )
                    .await
                    .unwrap();

                for request in requests {
                    let applied = controller.set_zoom_level(request).await.unwrap();
                    assert_eq!(applied, request.clamp(0.5, 10.0));
                    assert_eq!(controller.state().zoom.current, applied);
                    assert_eq!(rig.zoom_factor(), applied);
                }
            });

            crablens::invariant_ppt::contract_test(
                "zoom publish",
                &["Published zoom range must satisfy 0 < min <= current <= max"],
            );
        }
    }
}

#[cfg(feature = "recording")]
mod encoder_fuzz {
    use super::*;
    use crablens::recording::H264Encoder;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Odd or zero dimensions are rejected, never a panic
        #[test]
        fn fuzz_encoder_dimensions(width in 0u32..64, height in 0u32..64) {
            let result = H264Encoder::new(width, height);
            let valid = width > 0 && height > 0 && width % 2 == 0 && height % 2 == 0;
            if !valid {
                prop_assert!(result.is_err());
            }
        }

        /// Short or oversized frames return errors
        #[test]
        fn fuzz_encode_wrong_length(len in 0usize..1000) {
            let mut encoder = match H264Encoder::new(16, 16) {
                Ok(e) => e,
                Err(_) => return Ok(()),
            };
            let frame = vec![0u8; len];
            let result = encoder.encode_rgb(&frame);
            if len != 16 * 16 * 3 {
                prop_assert!(result.is_err());
            }
        }
    }
}
