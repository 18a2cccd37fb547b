//! Headless visibility and shadow demo
//!
//! Drops a field of cubes onto the ground with the physics thread while an
//! orbiting camera renders frames through the recording backend. Per-frame
//! culling and shadow statistics are logged.
//!
//! Usage: `vista_demo [config.toml|config.ron]`

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vista_engine::config::{Config, ConfigError};
use vista_engine::core::config::ApplicationConfig;
use vista_engine::foundation::logging;
use vista_engine::foundation::math::{Transform, Vec3};
use vista_engine::physics::{apply_snapshot, BodyHandle, PhysicsError, PhysicsThread, RigidBody};
use vista_engine::render::{Camera, FrameRenderer, GraphicsContext, HeadlessBackend, MeshHandle, RenderError};
use vista_engine::scene::{LightFactory, MeshInstance, NodeId, Scene, SceneNode, AABB};

const FRAME_COUNT: u64 = 240;
const CUBE_COUNT: usize = 400;
const STATS_INTERVAL: u64 = 30;

const GROUND_MESH: MeshHandle = MeshHandle(1);
const CUBE_MESH: MeshHandle = MeshHandle(2);

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Physics(#[from] PhysicsError),
}

struct DemoApp {
    config: ApplicationConfig,
    ctx: GraphicsContext<HeadlessBackend>,
    renderer: FrameRenderer,
    scene: Scene,
    camera: Camera,
    physics: PhysicsThread,
    bindings: HashMap<BodyHandle, NodeId>,
}

impl DemoApp {
    fn new(config: ApplicationConfig) -> Result<Self, DemoError> {
        log::info!("Creating demo with {:?} conventions", config.backend);

        let mut ctx = GraphicsContext::new(HeadlessBackend::new(), config.backend);
        let renderer = FrameRenderer::new(&mut ctx, &config)?;
        let physics = PhysicsThread::spawn(&config.physics)?;

        let mut camera = Camera::perspective(Vec3::new(0.0, 12.0, 40.0), 60.0, 16.0 / 9.0, 0.1, 200.0);
        camera.look_at(Vec3::new(0.0, 0.0, 0.0), Vec3::y());

        Ok(Self {
            config,
            ctx,
            renderer,
            scene: Scene::new(),
            camera,
            physics,
            bindings: HashMap::new(),
        })
    }

    fn initialize(&mut self) -> Result<(), DemoError> {
        let ground_height = self.config.physics.ground_height;
        self.scene.add_node(
            SceneNode::new("ground")
                .with_transform(Transform::from_position(Vec3::new(0.0, ground_height - 0.5, 0.0)))
                .with_mesh(MeshInstance::new(
                    GROUND_MESH,
                    AABB::new(Vec3::new(-60.0, -0.5, -60.0), Vec3::new(60.0, 0.5, 60.0)),
                )),
        );

        let mut rng = StdRng::seed_from_u64(7);
        let cube_bounds = AABB::new(Vec3::repeat(-0.5), Vec3::repeat(0.5));
        for i in 0..CUBE_COUNT {
            let position = Vec3::new(
                rng.gen_range(-40.0..40.0),
                rng.gen_range(2.0..30.0),
                rng.gen_range(-40.0..40.0),
            );
            let node = self.scene.add_node(
                SceneNode::new(format!("cube_{}", i))
                    .with_transform(Transform::from_position(position))
                    .with_mesh(MeshInstance::new(CUBE_MESH, cube_bounds)),
            );

            let spin = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
            let body = RigidBody::dynamic(position)
                .with_velocity(Vec3::zeros(), spin)
                .with_restitution(rng.gen_range(0.2..0.7));
            let handle = self.physics.add_body(body)?;
            self.bindings.insert(handle, node);
        }

        self.scene.add_node(SceneNode::new("sun").with_light(LightFactory::directional(
            Vec3::new(-0.4, -1.0, -0.3),
            Vec3::new(1.0, 0.95, 0.85),
            3.0,
        )));

        for i in 0..6 {
            let angle = i as f32 / 6.0 * std::f32::consts::TAU;
            let position = Vec3::new(angle.cos() * 20.0, 8.0, angle.sin() * 20.0);
            self.scene.add_node(
                SceneNode::new(format!("spot_{}", i))
                    .with_transform(Transform::from_position(position))
                    .with_light(LightFactory::spot(-position.normalize(), Vec3::repeat(1.0), 6.0, 30.0, 0.3, 0.5)),
            );
        }

        for i in 0..12 {
            let position = Vec3::new(rng.gen_range(-30.0..30.0), rng.gen_range(2.0..6.0), rng.gen_range(-30.0..30.0));
            self.scene.add_node(
                SceneNode::new(format!("point_{}", i))
                    .with_transform(Transform::from_position(position))
                    .with_light(LightFactory::point(Vec3::new(1.0, 0.6, 0.3), rng.gen_range(1.0..5.0), 12.0)),
            );
        }

        log::info!("Scene ready: {} nodes, {} bodies", self.scene.len(), self.bindings.len());
        Ok(())
    }

    fn run(&mut self) -> Result<(), DemoError> {
        let frame_time = Duration::from_secs_f32(1.0 / 60.0);
        let start = Instant::now();

        for frame in 0..FRAME_COUNT {
            let frame_start = Instant::now();

            if let Some(snapshot) = self.physics.latest_snapshot() {
                apply_snapshot(&snapshot, &self.bindings, &mut self.scene);
            }

            self.camera.rotate_about_position(0.01, 0.0);
            let stats = self.renderer.render_frame(&mut self.ctx, &self.scene, &self.camera)?;

            if frame % STATS_INTERVAL == 0 {
                log::info!(
                    "Frame {}: {}/{} visible, {} lights in atlas, {} atlas draws, {} cascade draws, {} nodes culled",
                    stats.frame_index,
                    stats.visible_objects,
                    stats.object_count,
                    stats.shadowed_lights,
                    stats.shadow.draw_calls,
                    stats.cascades.draw_calls,
                    stats.culling.nodes_culled
                );
            }

            // Keep the recording from growing without bound
            self.ctx.backend.take_commands();

            if let Some(remaining) = frame_time.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        log::info!("Rendered {} frames in {:.2?}", FRAME_COUNT, start.elapsed());
        Ok(())
    }

    fn cleanup(mut self) -> Result<(), DemoError> {
        log::info!("Cleaning up demo...");
        self.physics.shutdown()?;
        self.renderer.destroy(&mut self.ctx)?;
        let backend = self.ctx.shutdown()?;
        log::info!(
            "Backend resources left: {} textures, {} framebuffers, {} shaders",
            backend.live_textures(),
            backend.live_framebuffers(),
            backend.live_shaders()
        );
        Ok(())
    }
}

fn load_config() -> Result<ApplicationConfig, DemoError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ApplicationConfig::load_from_file(&path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init_with_level(&config.engine.log_level);

    let mut app = DemoApp::new(config)?;
    app.initialize()?;
    app.run()?;
    app.cleanup()?;

    log::info!("Demo completed successfully");
    Ok(())
}
