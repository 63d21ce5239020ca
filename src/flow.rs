//! Flow control and application event loop.
//!
//! A "flow" is a self-contained part of the scene: it owns GPU resources,
//! reacts to input, updates itself every frame and says what to draw. The
//! engine owns the window, the GPU [`Context`] and the orbit camera, and
//! drives all flows from the winit event loop.
//!
//! # Lifecycle
//!
//! Each frame, on `RedrawRequested`:
//! 1. apply pending orbit-control input to the camera
//! 2. call `on_update` on all flows (animations)
//! 3. upload camera and light uniforms
//! 4. collect `on_render` from all flows and draw them
//! 5. present and request the next redraw
//!
//! Input events are handed to the orbit controller first and then to every
//! flow via `on_window_events` / `on_device_events`.

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
#[cfg(feature = "integration-tests")]
use tokio::runtime::Runtime;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::model::{DrawLight, DrawModel},
    render::Instanced,
};
pub use crate::render::Render;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

///
/// Output of every lifecycle hook.
///
/// `Out::Configure` mutates the [`Context`] after the hook returned, for
/// instance to move a light or change the clear colour.
///
/// `Empty` is the default output used when nothing has to change.
///
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// A renderable, updatable part of the scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction; configure the context here
/// 2. `on_window_events()` and `on_device_events()` are called for each winit input event
/// 3. `on_update()` is called every frame before rendering
/// 4. `on_render()` is called every frame and specifies how to draw `self`
pub trait GraphicsFlow<State> {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out;

    /// Called every frame with the time since the previous frame.
    fn on_update(&mut self, ctx: &Context, state: &mut State, dt: Duration) -> Out;

    fn on_device_events(&mut self, _ctx: &Context, _state: &mut State, _event: &DeviceEvent) -> Out {
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, _state: &mut State, _event: &WindowEvent) -> Out {
        Out::Empty
    }

    /// Collect what should be drawn this frame.
    fn on_render(&self) -> Render<'_>;

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut State,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error>;
}

impl<State> Debug for dyn GraphicsFlow<State> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Asynchronous factory for a flow. Runs once the GPU context exists so the
/// flow can create buffers and load assets.
pub type FlowConstructor<S> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S>>>>>>;

/// GPU context plus the user state handed to every flow.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>, scene: SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, scene).await?;
        ctx.surface.configure(&ctx.device, &ctx.config);
        Ok(Self {
            ctx,
            state: State::default(),
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(size) = resize_target(self.ctx.scene.window.follow_resize, size) else {
            return;
        };
        if self.ctx.resize(size.width, size.height) {
            log::debug!("Surface resized to {}x{}", size.width, size.height);
        }
    }

    /// Configure the surface again after it was lost or went out of date.
    fn recover_surface(&mut self) {
        let size = recovery_size(
            self.ctx.scene.window.follow_resize,
            self.ctx.window.inner_size(),
            PhysicalSize::new(self.ctx.config.width, self.ctx.config.height),
        );
        if !self.ctx.resize(size.width, size.height) {
            log::debug!("Surface has no area, skipping reconfiguration");
        }
    }

    #[cfg(feature = "integration-tests")]
    fn padded_size(&self) -> (u32, u32) {
        // Buffer copies need rows of 256 bytes, that is 64 RGBA pixels
        (self.ctx.config.width.div_ceil(64) * 64, self.ctx.config.height)
    }

    #[cfg(feature = "integration-tests")]
    fn test_extent(&self) -> wgpu::Extent3d {
        let (width, height) = self.padded_size();
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }

    #[cfg(feature = "integration-tests")]
    fn test_texture(&self, format: wgpu::TextureFormat, label: &str) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: self.test_extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    fn render(
        &mut self,
        graphics_flows: &mut Vec<Box<dyn GraphicsFlow<State>>>,
        #[cfg(feature = "integration-tests")] async_runtime: &Runtime,
        #[cfg(feature = "integration-tests")] event_loop: &winit::event_loop::EventLoopProxy<
            FlowEvent<State>,
        >,
    ) -> Result<(), wgpu::CurrentSurfaceTexture> {
        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(t) | wgpu::CurrentSurfaceTexture::Suboptimal(t) => t,
            other => return Err(other),
        };

        #[cfg(not(feature = "integration-tests"))]
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        #[cfg(feature = "integration-tests")]
        let (tex, depth) = (
            self.test_texture(self.ctx.config.format, "Golden Image Test Output Texture"),
            self.test_texture(
                crate::data_structures::texture::Texture::DEPTH_FORMAT,
                "Golden Image Test Depth Texture",
            ),
        );
        #[cfg(feature = "integration-tests")]
        let (view, depth_view) = (
            tex.create_view(&wgpu::TextureViewDescriptor::default()),
            depth.create_view(&wgpu::TextureViewDescriptor::default()),
        );
        #[cfg(not(feature = "integration-tests"))]
        let depth_view = &self.ctx.depth_texture.view;
        #[cfg(feature = "integration-tests")]
        let depth_view = &depth_view;

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

            if let Some(helper) = &self.ctx.light.helper {
                render_pass.set_pipeline(&self.ctx.pipelines.light);
                render_pass.draw_light_model(
                    helper,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }

            let mut basics: Vec<Instanced> = Vec::new();
            graphics_flows.iter().for_each(|flow| {
                flow.on_render().collect(&mut basics);
            });

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("you attempted to render something with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let u32_size = std::mem::size_of::<u32>() as u32;
            let (width, height) = self.padded_size();
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (u32_size * width * height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Golden Image Test Readback"),
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(u32_size * width),
                        rows_per_image: Some(height),
                    },
                },
                self.test_extent(),
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        {
            use std::convert::identity;

            let (width, height) = self.padded_size();
            let buffer_slice = output_buffer.slice(..);
            let fut_img = async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    tx.send(result).unwrap();
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(Duration::from_secs(3)),
                    })
                    .unwrap();
                rx.receive().await.unwrap().unwrap();
                let data = buffer_slice.get_mapped_range();
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(width, height, data).unwrap()
            };
            let mut img: image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView> =
                async_runtime.block_on(fut_img);
            let state = &mut self.state;
            let all_passed = graphics_flows
                .iter_mut()
                .map(|flow| flow.render_to_texture(&self.ctx, state, &mut img))
                .map(|res| match res {
                    Err(e) => panic!("{}", e),
                    Ok(ImageTestResult::Passed) => true,
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Waiting) => false,
                })
                .all(identity);
            if all_passed {
                event_loop
                    .send_event(FlowEvent::Exit)
                    .expect("All assertions passed but the winit event-loop could not safely exit")
            }
        }

        output.present();
        Ok(())
    }
}

pub struct App<State: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State>>,
    scene: SceneConfig,
    state: Option<AppState<State>>,
    graphics_flows: Vec<Box<dyn GraphicsFlow<State>>>,
    // Taken once the window exists
    constructors: Option<Vec<FlowConstructor<State>>>,
    last_time: Instant,
}

impl<State: 'static> App<State> {
    fn new(
        event_loop: &EventLoop<FlowEvent<State>>,
        scene: SceneConfig,
        constructors: Vec<FlowConstructor<State>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            scene,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
        })
    }

    fn init_flows(&mut self) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(&mut app_state.ctx, out);
        }
        self.last_time = Instant::now();
        app_state.ctx.window.request_redraw();
    }
}

pub(crate) enum FlowEvent<State: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State>>>,
    },
    #[allow(dead_code)]
    Failed(String),
    #[allow(dead_code)]
    Exit,
}

impl<State> Debug for FlowEvent<State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(reason) => f.debug_tuple("Failed").field(reason).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

impl<State: 'static + Default> ApplicationHandler<FlowEvent<State>> for App<State> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            // resumed again after a suspend, the context is still alive
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(&self.scene.window.title);

        #[cfg(not(target_arch = "wasm32"))]
        {
            window_attributes = window_attributes.with_inner_size(PhysicalSize::new(
                self.scene.window.width,
                self.scene.window.height,
            ));
            window_attributes = window_attributes.with_transparent(self.scene.window.alpha);
        }

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let scene = self.scene.clone();
        let init_future = async move {
            let app_state = AppState::new(window, scene).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => {
                    self.state = Some(app_state);
                    self.graphics_flows = flows;
                    self.init_flows();
                }
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(format!("{:#}", e)),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State>) {
        match event {
            // Sent by the web `spawn_local` once the page has loaded the context
            FlowEvent::Initialized { state, flows } => {
                self.state = Some(state);
                self.graphics_flows = flows;
                if let Some(app_state) = self.state.as_mut() {
                    let size = app_state.ctx.window.inner_size();
                    app_state.resize(size);
                }
                self.init_flows();
            }
            FlowEvent::Failed(reason) => {
                log::error!("App initialization failed: {}", reason);
                event_loop.exit();
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(app_state) = &mut self.state else {
            return;
        };
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_device_events(&app_state.ctx, &mut app_state.state, &event);
            handle_flow_output(&mut app_state.ctx, out);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(app_state) = &mut self.state else {
            return;
        };

        app_state.ctx.camera.controller.handle_window_events(&event);

        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_window_events(&app_state.ctx, &mut app_state.state, &event);
            handle_flow_output(&mut app_state.ctx, out);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app_state.resize(size),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                let ctx = &mut app_state.ctx;
                let fovy = ctx.projection.fovy();
                ctx.camera
                    .controller
                    .update_camera(&mut ctx.camera.camera, fovy);

                for flow in self.graphics_flows.iter_mut() {
                    let out = flow.on_update(&app_state.ctx, &mut app_state.state, dt);
                    handle_flow_output(&mut app_state.ctx, out);
                }
                app_state.ctx.write_uniforms();

                match app_state.render(
                    &mut self.graphics_flows,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(()) => {}
                    Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                        app_state.recover_surface();
                    }
                    Err(wgpu::CurrentSurfaceTexture::Timeout) => {
                        log::debug!("Surface timed out, skipping frame");
                    }
                    Err(e) => {
                        log::error!("Unable to render {:?}", e);
                    }
                }
                // keep animating: every frame schedules the next one
                app_state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }
}

/// Size to configure after the window was resized, `None` when the surface
/// keeps its initial size.
fn resize_target(follow_resize: bool, size: PhysicalSize<u32>) -> Option<PhysicalSize<u32>> {
    follow_resize.then_some(size)
}

/// Size to reconfigure a lost or outdated surface at.
fn recovery_size(
    follow_resize: bool,
    window: PhysicalSize<u32>,
    configured: PhysicalSize<u32>,
) -> PhysicalSize<u32> {
    if follow_resize { window } else { configured }
}

fn handle_flow_output(ctx: &mut Context, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// Initialize logging for the current platform. Safe to call more than once.
pub fn init_logging() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info,wgpu_core=warn,wgpu_hal=warn"),
        )
        .try_init()
        {
            eprintln!("Warning: Could not initialize logger: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        // a second init only fails because a logger is already installed
        let _ = console_log::init_with_level(log::Level::Info);
    }
}

pub fn run<State: 'static + Default>(
    scene: SceneConfig,
    constructors: Vec<FlowConstructor<State>>,
) -> anyhow::Result<()> {
    init_logging();
    scene.validate()?;

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<State>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent<State>> = EventLoop::with_user_event().build()?;

    let mut app: App<State> = App::new(&event_loop, scene, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_events_are_ignored_without_follow_resize() {
        let size = PhysicalSize::new(800, 600);
        assert_eq!(resize_target(true, size), Some(size));
        assert_eq!(resize_target(false, size), None);
    }

    #[test]
    fn lost_surface_keeps_initial_size_without_follow_resize() {
        let window = PhysicalSize::new(1920, 1080);
        let configured = PhysicalSize::new(1280, 720);
        assert_eq!(recovery_size(false, window, configured), configured);
        assert_eq!(recovery_size(true, window, configured), window);
    }

    #[test]
    fn default_output_is_empty() {
        assert!(matches!(Out::default(), Out::Empty));
    }
}
