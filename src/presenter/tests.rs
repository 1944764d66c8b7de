// src/presenter/tests.rs

#[cfg(test)]
mod present_tests {
    use crate::display::{
        DrawTarget, HeadlessSurfaceDriver, SurfaceDriver, SurfaceHandle, SurfaceSlot,
    };
    use crate::error::{BridgeError, BridgeResult};
    use crate::frame::FrameBuffer;
    use crate::pixel::{FormatPair, PixelFormat};
    use crate::presenter::Presenter;
    use std::sync::Arc;
    use test_log::test;

    const BLACK: [u8; 4] = [0, 0, 0, 0xFF];

    /// Claims 4x4 RGBA surfaces but only has memory for half of one.
    struct ShortMemoryDriver;

    impl SurfaceDriver for ShortMemoryDriver {
        fn acquire_draw_target(&self, handle: SurfaceHandle) -> BridgeResult<DrawTarget> {
            DrawTarget::new(
                handle,
                4,
                4,
                16,
                PixelFormat::Rgba8888,
                vec![0u8; 32].into_boxed_slice(),
            )
        }

        fn release_draw_target(&self, _target: DrawTarget) {
            panic!("no target was ever lent");
        }
    }

    fn setup(target: PixelFormat) -> (Arc<HeadlessSurfaceDriver>, Arc<SurfaceSlot>, Presenter) {
        let driver = Arc::new(HeadlessSurfaceDriver::new(target));
        let slot = Arc::new(SurfaceSlot::new());
        let presenter = Presenter::new(
            driver.clone() as Arc<dyn SurfaceDriver>,
            slot.clone(),
            FormatPair::new(PixelFormat::Rgba8888, target),
            BLACK,
        )
        .unwrap();
        (driver, slot, presenter)
    }

    fn solid_frame(w: i32, h: i32, rgba: [u8; 4]) -> FrameBuffer {
        let fb = FrameBuffer::new(w, h, PixelFormat::Rgba8888).unwrap();
        let data: Vec<u8> = rgba.iter().copied().cycle().take(fb.len()).collect();
        fb.write(&data).unwrap();
        fb
    }

    #[test]
    fn no_surface_means_surface_unavailable_and_untouched_frame() {
        let (driver, _slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let fb = solid_frame(4, 4, [1, 2, 3, 4]);
        let mut before = Vec::new();
        let seq = fb.copy_snapshot(&mut before);

        assert_eq!(
            presenter.present_frame(&fb).unwrap_err(),
            BridgeError::SurfaceUnavailable(None)
        );

        let mut after = Vec::new();
        assert_eq!(fb.copy_snapshot(&mut after), seq);
        assert_eq!(before, after);
        assert_eq!(driver.outstanding_targets(), 0);
    }

    #[test]
    fn presents_converted_pixels_to_the_current_surface() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let h = driver.create_surface(4, 4);
        slot.attach(h);
        let fb = solid_frame(4, 4, [10, 20, 30, 255]);

        let report = presenter.present_frame(&fb).unwrap();
        assert_eq!(report.handle, h);
        assert_eq!(report.sequence, 1);
        assert_eq!(driver.post_count(h), 1);

        let posted = driver.last_posted(h).unwrap();
        assert!(posted.pixels.chunks_exact(4).all(|px| px == [30, 20, 10, 255]));
    }

    #[test]
    fn smaller_frames_are_centred_on_a_cleared_target() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Rgba8888);
        let h = driver.create_surface(4, 4);
        slot.attach(h);
        let fb = solid_frame(2, 2, [200, 100, 50, 255]);

        presenter.present_frame(&fb).unwrap();
        let posted = driver.last_posted(h).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let i = y * posted.stride + x * 4;
                let px = &posted.pixels[i..i + 4];
                if (1..3).contains(&x) && (1..3).contains(&y) {
                    assert_eq!(px, [200, 100, 50, 255], "inside at {x},{y}");
                } else {
                    assert_eq!(px, BLACK, "border at {x},{y}");
                }
            }
        }
    }

    #[test]
    fn larger_frames_are_clipped_around_the_centre() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Rgba8888);
        let h = driver.create_surface(2, 1);
        slot.attach(h);

        let fb = FrameBuffer::new(4, 1, PixelFormat::Rgba8888).unwrap();
        fb.write(&[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4])
            .unwrap();
        presenter.present_frame(&fb).unwrap();
        assert_eq!(
            driver.last_posted(h).unwrap().pixels,
            vec![2, 2, 2, 2, 3, 3, 3, 3]
        );
    }

    #[test]
    fn failed_blit_releases_without_posting() {
        // Driver surfaces are 565 but the presenter converts to BGRA.
        let driver = Arc::new(HeadlessSurfaceDriver::new(PixelFormat::Rgb565));
        let slot = Arc::new(SurfaceSlot::new());
        let mut presenter = Presenter::new(
            driver.clone() as Arc<dyn SurfaceDriver>,
            slot.clone(),
            FormatPair::new(PixelFormat::Rgba8888, PixelFormat::Bgra8888),
            BLACK,
        )
        .unwrap();
        let h = driver.create_surface(4, 4);
        slot.attach(h);
        let fb = solid_frame(4, 4, [1, 2, 3, 4]);

        assert!(matches!(
            presenter.present_frame(&fb),
            Err(BridgeError::UnsupportedFormat { .. })
        ));
        assert_eq!(driver.outstanding_targets(), 0);
        assert_eq!(driver.post_count(h), 0);
        assert_eq!(driver.last_posted(h), None);
        // The surface is still usable.
        assert!(driver.acquire_draw_target(h).is_ok());
    }

    #[test]
    fn destroyed_surface_drops_the_frame() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let h = driver.create_surface(4, 4);
        slot.attach(h);
        driver.destroy_surface(h);
        let fb = solid_frame(4, 4, [1, 2, 3, 4]);

        let err = presenter.present_frame(&fb).unwrap_err();
        assert_eq!(err, BridgeError::SurfaceUnavailable(Some(h)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn frame_in_the_wrong_format_is_rejected_before_acquiring() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let h = driver.create_surface(2, 2);
        slot.attach(h);
        let fb = FrameBuffer::new(2, 2, PixelFormat::Rgb565).unwrap();
        assert!(matches!(
            presenter.present_frame(&fb),
            Err(BridgeError::UnsupportedFormat { .. })
        ));
        assert_eq!(driver.outstanding_targets(), 0);
    }

    #[test]
    fn malformed_targets_drop_the_frame_instead_of_panicking() {
        let slot = Arc::new(SurfaceSlot::new());
        let mut presenter = Presenter::new(
            Arc::new(ShortMemoryDriver),
            slot.clone(),
            FormatPair::new(PixelFormat::Rgba8888, PixelFormat::Rgba8888),
            BLACK,
        )
        .unwrap();
        slot.attach(SurfaceHandle::from_raw(5));
        let fb = solid_frame(4, 4, [1, 2, 3, 4]);
        assert!(matches!(
            presenter.present_frame(&fb),
            Err(BridgeError::InvalidDrawTarget(_))
        ));

        // A zero-sized headless surface is refused the same way and stays usable.
        let (driver, slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let h = driver.create_surface(0, 4);
        slot.attach(h);
        assert!(matches!(
            presenter.present_frame(&fb),
            Err(BridgeError::InvalidDrawTarget(_))
        ));
        assert_eq!(driver.outstanding_targets(), 0);
        assert_eq!(driver.post_count(h), 0);

        driver.resize_surface(h, 4, 4).unwrap();
        assert!(presenter.present_frame(&fb).is_ok());
        assert_eq!(driver.post_count(h), 1);
    }

    #[test]
    fn reports_carry_the_slot_generation() {
        let (driver, slot, mut presenter) = setup(PixelFormat::Bgra8888);
        let h = driver.create_surface(4, 4);
        slot.attach(h);
        let fb = solid_frame(4, 4, [1, 2, 3, 4]);

        let first = presenter.present_frame(&fb).unwrap();
        assert_eq!(first.generation, slot.state().generation());

        driver.resize_surface(h, 8, 8).unwrap();
        slot.resize(h, crate::frame::FrameDimensions::new(8, 8).unwrap());
        let second = presenter.present_frame(&fb).unwrap();
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!((second.surface_width, second.surface_height), (8, 8));
    }
}
