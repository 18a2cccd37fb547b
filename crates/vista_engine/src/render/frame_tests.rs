//! End-to-end frame tests against the headless backend

use std::collections::HashMap;

use crate::core::config::{ApplicationConfig, GraphicsBackend};
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::physics::{apply_snapshot, BodyHandle, BodyState, PhysicsSnapshot};
use crate::render::{BackendCommand, Camera, FrameRenderer, GraphicsContext, HeadlessBackend, MeshHandle};
use crate::scene::{LightFactory, MeshInstance, NodeId, Scene, SceneNode, AABB};
use crate::shadows::CASCADE_COUNT;

fn cube(mesh: u64) -> MeshInstance {
    MeshInstance::new(MeshHandle(mesh), AABB::new(Vec3::repeat(-0.5), Vec3::repeat(0.5)))
}

fn add_cube(scene: &mut Scene, position: Vec3) -> NodeId {
    scene.add_node(SceneNode::new("cube").with_transform(Transform::from_position(position)).with_mesh(cube(1)))
}

fn camera() -> Camera {
    let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0);
    camera.look_at(Vec3::zeros(), Vec3::y());
    camera
}

fn setup(backend: GraphicsBackend) -> (GraphicsContext<HeadlessBackend>, FrameRenderer) {
    let config = ApplicationConfig { backend, ..Default::default() };
    let mut ctx = GraphicsContext::new(HeadlessBackend::new(), config.backend);
    let renderer = FrameRenderer::new(&mut ctx, &config).unwrap();
    (ctx, renderer)
}

fn count_passes(ctx: &GraphicsContext<HeadlessBackend>) -> usize {
    ctx.backend
        .commands()
        .iter()
        .filter(|command| matches!(command, BackendCommand::BeginDepthPass { .. }))
        .count()
}

#[test]
fn test_camera_culling_and_rebuild_on_revision() {
    let (mut ctx, mut renderer) = setup(GraphicsBackend::Vulkan);
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::zeros());
    let moving = add_cube(&mut scene, Vec3::new(2.0, 0.0, 0.0));
    add_cube(&mut scene, Vec3::new(0.0, 0.0, 20.0));

    let first = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert!(first.bvh_rebuilt);
    assert_eq!(first.object_count, 3);
    assert_eq!(renderer.visible_objects(), &[0, 1]);

    let second = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert!(!second.bvh_rebuilt);
    assert_eq!(second.frame_index, 1);

    // Move the second cube behind the camera
    scene.set_local_transform(moving, Transform::from_position(Vec3::new(0.0, 0.0, 30.0)));
    let third = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert!(third.bvh_rebuilt);
    assert_eq!(renderer.visible_objects(), &[0]);
}

#[test]
fn test_visibility_identical_across_backends() {
    let mut scene = Scene::new();
    for x in -6..=6 {
        for z in -6..=6 {
            add_cube(&mut scene, Vec3::new(x as f32 * 3.0, 0.0, z as f32 * 3.0));
        }
    }
    let mut camera = Camera::perspective(Vec3::new(5.0, 4.0, 12.0), 50.0, 16.0 / 9.0, 0.5, 40.0);
    camera.look_at(Vec3::new(-2.0, 0.0, -4.0), Vec3::y());

    let mut reference: Option<Vec<usize>> = None;
    for backend in [GraphicsBackend::Vulkan, GraphicsBackend::Direct3D11, GraphicsBackend::Metal, GraphicsBackend::OpenGl] {
        let (mut ctx, mut renderer) = setup(backend);
        renderer.render_frame(&mut ctx, &scene, &camera).unwrap();
        let visible = renderer.visible_objects().to_vec();
        assert!(!visible.is_empty());
        assert!(visible.len() < scene.len());

        match &reference {
            Some(expected) => assert_eq!(&visible, expected, "{:?}", backend),
            None => reference = Some(visible),
        }
    }
}

#[test]
fn test_full_frame_with_sun_spot_and_point() {
    let (mut ctx, mut renderer) = setup(GraphicsBackend::Vulkan);
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::zeros());
    add_cube(&mut scene, Vec3::new(2.0, 0.0, -1.0));
    scene.add_node(SceneNode::new("sun").with_light(LightFactory::directional(
        Vec3::new(-0.4, -1.0, -0.3),
        Vec3::repeat(1.0),
        2.0,
    )));
    let spot = scene.add_node(
        SceneNode::new("spot")
            .with_transform(Transform::from_position(Vec3::new(0.0, 6.0, 0.0)))
            .with_light(LightFactory::spot(Vec3::new(0.0, -1.0, 0.0), Vec3::repeat(1.0), 8.0, 15.0, 0.3, 0.5)),
    );
    let point = scene.add_node(
        SceneNode::new("point")
            .with_transform(Transform::from_position(Vec3::new(3.0, 3.0, 0.0)))
            .with_light(LightFactory::point(Vec3::repeat(1.0), 4.0, 10.0)),
    );

    let stats = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();

    assert_eq!(stats.shadowed_lights, 2);
    assert_eq!(stats.cascades.passes as usize, CASCADE_COUNT);
    assert_eq!(stats.shadow.passes, 2);
    assert_eq!(stats.shadow.views, 7);
    assert_eq!(count_passes(&ctx), CASCADE_COUNT + 2);
    assert!(!ctx.backend.is_pass_active());

    let atlas = renderer.atlas();
    assert_eq!(atlas.allocations(spot).unwrap()[0].page_index, 0);
    assert!(atlas.allocations(point).unwrap().iter().all(|a| a.page_index == 2));

    // Both cubes sit under the spot light
    assert!(stats.shadow.instances >= 2);
    assert!(renderer.csm().split(CASCADE_COUNT - 1) <= 100.0);
}

#[test]
fn test_disabled_shadows_record_nothing() {
    let (mut ctx, mut renderer) = setup(GraphicsBackend::Direct3D11);
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::zeros());
    scene.add_node(SceneNode::new("sun").with_light(LightFactory::directional(
        Vec3::new(0.0, -1.0, 0.0),
        Vec3::repeat(1.0),
        1.0,
    )));
    scene.add_node(
        SceneNode::new("point")
            .with_transform(Transform::from_position(Vec3::new(0.0, 3.0, 0.0)))
            .with_light(LightFactory::point(Vec3::repeat(1.0), 4.0, 10.0)),
    );

    renderer.set_shadows_enabled(false);
    let stats = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert_eq!(stats.shadowed_lights, 0);
    assert_eq!(count_passes(&ctx), 0);
    assert_eq!(renderer.atlas().iter_allocations().count(), 0);

    renderer.set_shadows_enabled(true);
    let stats = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert_eq!(stats.shadowed_lights, 1);
    assert_eq!(count_passes(&ctx), CASCADE_COUNT + 1);
}

#[test]
fn test_physics_snapshot_triggers_rebuild() {
    let (mut ctx, mut renderer) = setup(GraphicsBackend::Metal);
    let mut scene = Scene::new();
    let ball = add_cube(&mut scene, Vec3::new(0.0, 0.0, 50.0));

    renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert!(renderer.visible_objects().is_empty());

    let bindings = HashMap::from([(BodyHandle(0), ball)]);
    let snapshot = PhysicsSnapshot {
        step: 10,
        bodies: vec![BodyState {
            handle: BodyHandle(0),
            position: Vec3::new(0.0, 1.0, 0.0),
            orientation: Quat::identity(),
        }],
    };
    assert_eq!(apply_snapshot(&snapshot, &bindings, &mut scene), 1);

    let stats = renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert!(stats.bvh_rebuilt);
    assert_eq!(renderer.visible_objects(), &[0]);
}

#[test]
fn test_teardown_releases_every_resource() {
    let (mut ctx, mut renderer) = setup(GraphicsBackend::Vulkan);
    let mut scene = Scene::new();
    add_cube(&mut scene, Vec3::zeros());
    scene.add_node(
        SceneNode::new("spot")
            .with_transform(Transform::from_position(Vec3::new(0.0, 4.0, 0.0)))
            .with_light(LightFactory::spot(Vec3::new(0.0, -1.0, 0.0), Vec3::repeat(1.0), 1.0, 10.0, 0.2, 0.4)),
    );
    renderer.render_frame(&mut ctx, &scene, &camera()).unwrap();
    assert_eq!(ctx.backend.live_textures(), 2);
    assert_eq!(ctx.backend.live_shaders(), 1);

    renderer.destroy(&mut ctx).unwrap();
    let backend = ctx.shutdown().unwrap();
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(backend.live_framebuffers(), 0);
    assert_eq!(backend.live_shaders(), 0);
}
