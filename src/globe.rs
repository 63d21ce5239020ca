//! The globe scene: a textured sphere at the origin lit by a point light
//! that orbits it.

use instant::Duration;
use wgpu::util::DeviceExt;

use crate::{
    context::{Context, InitContext},
    data_structures::{instance::Instance, model::Model, sphere::SphereGeometry},
    flow::{FlowConstructor, GraphicsFlow, Out},
    render::{Instanced, Render},
    resources::{
        animation::{AnimationClock, LightOrbit},
        load_globe_model,
    },
};

pub struct GlobeFlow {
    model: Model,
    instance_buffer: wgpu::Buffer,
    orbit: LightOrbit,
    clock: AnimationClock,
}

impl GlobeFlow {
    pub async fn new(ctx: InitContext) -> Self {
        let globe = &ctx.scene.globe;
        let geometry = SphereGeometry::new(globe.radius, globe.width_segments, globe.height_segments);
        log::info!(
            "Globe: radius {} with {} vertices and {} triangles",
            geometry.radius,
            geometry.vertices.len(),
            geometry.indices.len() / 3
        );
        let model = load_globe_model(&ctx.device, &ctx.queue, &geometry, &globe.texture).await;

        let instance = Instance::new();
        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Globe Instance Buffer"),
                contents: bytemuck::cast_slice(&[instance.to_raw()]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        Self {
            model,
            instance_buffer,
            orbit: LightOrbit::from(&ctx.scene.orbit),
            clock: AnimationClock::start(),
        }
    }
}

impl<State> GraphicsFlow<State> for GlobeFlow {
    fn on_init(&mut self, _ctx: &mut Context, _state: &mut State) -> Out {
        // the first on_update moves the light onto the orbit before anything is drawn
        Out::Empty
    }

    fn on_update(&mut self, _ctx: &Context, _state: &mut State, _dt: Duration) -> Out {
        let position = self.orbit.position_at(self.clock.now_ms());
        Out::Configure(Box::new(move |ctx: &mut Context| {
            ctx.light.set_point_position(position);
        }))
    }

    fn on_render(&self) -> Render<'_> {
        Render::Default(Instanced {
            instance: &self.instance_buffer,
            model: &self.model,
            amount: 1,
        })
    }

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut State,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<crate::flow::ImageTestResult, anyhow::Error> {
        Ok(crate::flow::ImageTestResult::Passed)
    }
}

/// Constructor for the globe flow, ready to hand to [`crate::flow::run`].
pub fn globe_constructor<State: 'static>() -> FlowConstructor<State> {
    Box::new(|ctx: InitContext| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<State>> = Box::new(GlobeFlow::new(ctx).await);
            flow
        })
    })
}
