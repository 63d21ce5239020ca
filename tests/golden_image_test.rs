#[cfg(feature = "integration-tests")]
mod common;

// winit allows one event loop per process, so every check on the globe frame
// lives in this single test.
#[test]
#[cfg(feature = "integration-tests")]
fn should_render_lit_globe_in_the_centre() {
    use crate::common::test_utils::TestRender;
    use orbit_globe::{
        context::{Context, InitContext},
        flow::{GraphicsFlow, ImageTestResult},
        globe::GlobeFlow,
    };
    use wgpu::Color;

    golden_image_test!(async move |ctx: InitContext| {
        let globe: Box<dyn GraphicsFlow<FrameCounter>> = Box::new(GlobeFlow::new(ctx).await);
        TestRender::new(
            Some(globe),
            |ctx: &mut Context| {
                ctx.clear_colour = Color::BLACK;
            },
            |ctx, state: &mut FrameCounter, actual| {
                if state.frame() == 0 {
                    return Ok(ImageTestResult::Waiting);
                }
                let (w, h) = (ctx.config.width, ctx.config.height);
                let black = image::Rgba([0, 0, 0, 255]);

                // radius 100 seen from 500 with a 50 degree fov covers under half the height
                for &(x, y) in &[(0, 0), (w / 2, 0), (w / 2, h - 1), (0, h / 2), (w - 1, h / 2)] {
                    assert_eq!(*actual.get_pixel(x, y), black, "pixel ({}, {})", x, y);
                }

                let centre = *actual.get_pixel(w / 2, h / 2);
                assert_ne!(centre, black, "globe should cover the centre");
                let brightness: u32 = centre.0[..3].iter().map(|&c| c as u32).sum();
                assert!(brightness > 30, "front of the globe should be lit, got {:?}", centre);
                Ok(ImageTestResult::Passed)
            },
        )
    });
}
