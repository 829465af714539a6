//! Property-based tests for the movie output
//!
//! Run with: cargo test --test recording_props --features recording

#[cfg(feature = "recording")]
mod recording_tests {
    use crablens::recording::{H264Encoder, MovieWriter};
    use proptest::prelude::*;
    use tempfile::tempdir;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        /// Even dimensions are always accepted
        #[test]
        fn encoder_accepts_even_dimensions(
            width in (8u32..320).prop_map(|w| w * 2),
            height in (8u32..240).prop_map(|h| h * 2),
        ) {
            let result = H264Encoder::new(width, height);
            prop_assert!(result.is_ok(), "rejected {}x{}: {:?}", width, height, result.err());
        }

        /// Every encoded frame starts with an Annex B start code
        #[test]
        fn encoded_frames_are_annex_b(gray_level in 0u8..255) {
            let mut encoder = H264Encoder::new(64, 48).unwrap();
            let encoded = encoder.encode_rgb(&vec![gray_level; 64 * 48 * 3]).unwrap();
            prop_assert!(!encoded.data.is_empty());
            prop_assert!(
                encoded.data.starts_with(&[0, 0, 0, 1]) || encoded.data.starts_with(&[0, 0, 1])
            );
        }

        /// Every muxed frame was written; the encoder may drop some
        #[test]
        fn movie_counts_written_frames(frames in 1usize..20) {
            let dir = tempdir().unwrap();
            let path = dir.path().join("props.mp4");
            let mut writer = MovieWriter::create(&path, 64, 48, 30.0).unwrap();
            prop_assert_eq!(writer.dimensions(), (64, 48));
            for i in 0..frames {
                writer.write_rgb(&vec![(i * 12) as u8; 64 * 48 * 3]).unwrap();
            }
            let stats = writer.finish().unwrap();
            prop_assert!(stats.video_frames >= 1 && stats.video_frames <= frames as u64);
            prop_assert_eq!(stats.path, path.clone());
            prop_assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }
}
