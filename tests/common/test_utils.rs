#[cfg(feature = "integration-tests")]
use orbit_globe::{
    context::Context,
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

pub(crate) struct FrameCounter(pub(crate) u32);
impl Default for FrameCounter {
    fn default() -> Self {
        Self(0)
    }
}
impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

#[cfg(feature = "integration-tests")]
pub(crate) type Validate = Box<
    dyn Fn(
        &Context,
        &mut FrameCounter,
        &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>,
>;

/// Wraps an optional scene flow with a one-off context setup and a check on
/// every rendered frame.
#[cfg(feature = "integration-tests")]
pub(crate) struct TestRender {
    pub(crate) inner: Option<Box<dyn GraphicsFlow<FrameCounter>>>,
    pub(crate) setup: Box<dyn Fn(&mut Context)>,
    pub(crate) validate: Validate,
}

#[cfg(feature = "integration-tests")]
impl TestRender {
    pub(crate) fn new(
        inner: Option<Box<dyn GraphicsFlow<FrameCounter>>>,
        setup: impl Fn(&mut Context) + 'static,
        validate: impl Fn(
            &Context,
            &mut FrameCounter,
            &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
        ) -> Result<ImageTestResult, anyhow::Error>
        + 'static,
    ) -> Self {
        Self {
            inner,
            setup: Box::new(setup),
            validate: Box::new(validate),
        }
    }
}

#[cfg(feature = "integration-tests")]
impl GraphicsFlow<FrameCounter> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, s: &mut FrameCounter) -> Out {
        if let Some(inner) = self.inner.as_mut() {
            if let Out::Configure(f) = inner.on_init(ctx, s) {
                f(ctx);
            }
        }
        // after the inner flow so the test has the last word
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, state: &mut FrameCounter, dt: std::time::Duration) -> Out {
        state.progress();
        match self.inner.as_mut() {
            Some(inner) => inner.on_update(ctx, state, dt),
            None => Out::Empty,
        }
    }

    fn on_render(&self) -> Render<'_> {
        match &self.inner {
            Some(inner) => inner.on_render(),
            None => Render::None,
        }
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        s: &mut FrameCounter,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, s, texture)
    }
}

#[macro_export]
macro_rules! golden_image_test {
    ($graphics_elem:expr) => {{
        use crate::common::test_utils::FrameCounter;
        use orbit_globe::flow::FlowConstructor;
        use orbit_globe::flow::GraphicsFlow;
        let constructor: FlowConstructor<FrameCounter> = Box::new(|init| {
            Box::pin(async move {
                let g_flow: Box<dyn GraphicsFlow<FrameCounter>> =
                    Box::new(($graphics_elem)(init).await);
                g_flow
            })
        });

        orbit_globe::flow::run(orbit_globe::SceneConfig::default(), vec![constructor])
            .expect("Failed to run flow for integration test.");
    }};
}
