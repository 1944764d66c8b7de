// src/frame/tests.rs

#[cfg(test)]
mod frame_tests {
    use crate::error::BridgeError;
    use crate::frame::{FrameBuffer, FrameDimensions};
    use crate::pixel::PixelFormat;
    use std::sync::atomic::{AtomicBool, Ordering};
    use test_log::test;

    #[test]
    fn size_is_width_times_height_times_bpp() {
        for (w, h) in [(1, 1), (3, 7), (640, 400), (1280, 800)] {
            for format in [PixelFormat::Rgba8888, PixelFormat::Rgb565] {
                let fb = FrameBuffer::new(w, h, format).unwrap();
                assert_eq!(fb.len(), w as usize * h as usize * format.bytes_per_pixel());
                assert_eq!(fb.read_snapshot().len(), fb.len());
            }
        }
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        for (w, h) in [(0, 10), (10, 0), (-1, 10), (10, -5), (0, 0), (i32::MIN, 1)] {
            assert_eq!(
                FrameBuffer::new(w, h, PixelFormat::Rgba8888).unwrap_err(),
                BridgeError::InvalidDimensions {
                    width: w as i64,
                    height: h as i64
                }
            );
        }
    }

    #[test]
    fn dimensions_are_fixed_at_construction() {
        let fb = FrameBuffer::new(4, 2, PixelFormat::Bgra8888).unwrap();
        assert_eq!(fb.dimensions(), FrameDimensions::new(4, 2).unwrap());
        fb.write(&[9u8; 32]).unwrap();
        assert_eq!(fb.len(), 32);
        assert_eq!(fb.dimensions().width(), 4);
        assert_eq!(fb.dimensions().height(), 2);
    }

    #[test]
    fn write_replaces_contents_and_bumps_sequence() {
        let fb = FrameBuffer::new(2, 2, PixelFormat::Rgba8888).unwrap();
        assert_eq!(fb.sequence(), 0);
        assert!(fb.read_snapshot().iter().all(|&b| b == 0));

        let seq = fb.write(&[7u8; 16]).unwrap();
        assert_eq!(seq, 1);
        let snap = fb.read_snapshot();
        assert_eq!(snap.sequence(), 1);
        assert!(snap.iter().all(|&b| b == 7));
    }

    #[test]
    fn wrong_length_write_is_rejected_without_publishing() {
        let fb = FrameBuffer::new(2, 2, PixelFormat::Rgba8888).unwrap();
        fb.write(&[1u8; 16]).unwrap();
        assert_eq!(
            fb.write(&[2u8; 15]),
            Err(BridgeError::FrameSizeMismatch {
                expected: 16,
                actual: 15
            })
        );
        let mut out = Vec::new();
        assert_eq!(fb.copy_snapshot(&mut out), 1);
        assert_eq!(out, vec![1u8; 16]);
    }

    #[test]
    fn failed_render_publishes_nothing() {
        let fb = FrameBuffer::new(2, 1, PixelFormat::Rgba8888).unwrap();
        fb.write(&[5u8; 8]).unwrap();
        let result = fb.write_with(|back| {
            back[..4].fill(0xEE);
            Err(BridgeError::Engine("half a frame".into()))
        });
        assert!(result.is_err());
        let snap = fb.read_snapshot();
        assert_eq!(snap.sequence(), 1);
        assert!(snap.iter().all(|&b| b == 5));
    }

    #[test]
    fn readers_never_observe_torn_frames() {
        let fb = FrameBuffer::new(64, 64, PixelFormat::Rgba8888).unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..2_000u32 {
                    let fill = (i % 251) as u8;
                    fb.write_with(|back| {
                        // Slow, byte-at-a-time fill widens any tearing window.
                        for b in back.iter_mut() {
                            *b = fill;
                        }
                        Ok(())
                    })
                    .unwrap();
                }
                done.store(true, Ordering::Release);
            });

            for _ in 0..2 {
                s.spawn(|| {
                    let mut last_seq = 0;
                    while !done.load(Ordering::Acquire) {
                        let snap = fb.read_snapshot();
                        let first = snap[0];
                        assert!(
                            snap.iter().all(|&b| b == first),
                            "torn frame at sequence {}",
                            snap.sequence()
                        );
                        assert!(snap.sequence() >= last_seq);
                        last_seq = snap.sequence();
                    }
                });
            }
        });

        assert_eq!(fb.sequence(), 2_000);
    }
}
