use std::{sync::Arc, thread};

use cgmath::Zero;
use lux_ngin::{
    Engine,
    config::{EngineConfig, SsaoConfig},
    math::{Color, Vec3},
    physics::{
        body::Body,
        forces::{ConstantForce, ForceGenerator, Gravity},
    },
    resources::primitives,
    world::{Entity, World},
};

use crate::common::test_utils::{assert_close, init_logger};

mod common;

const DT: f64 = 1.0 / 60.0;

#[test]
fn queued_entities_join_at_finalize() {
    init_logger();
    let world = World::new();
    let model = primitives::icosahedron(1.0, Color::WHITE);
    let a = world.enqueue(Entity::new(model.clone(), Body::new()));
    let b = world.enqueue(Entity::new(model, Body::new()));
    assert_ne!(a, b);
    assert_eq!(world.pending_len(), 2);
    assert!(world.is_empty());

    // queued bodies can already be edited
    let moved = world.with_body(a, |body| body.set_position(Vec3::new(0.0, 3.0, 0.0)));
    assert!(moved.is_some());

    let mut prepared = Vec::new();
    assert_eq!(world.finalize_pending(|entity| prepared.push(entity.id())), 2);
    assert_eq!(prepared, vec![a, b]);
    assert_eq!(world.pending_len(), 0);
    assert_eq!(world.len(), 2);
    assert_eq!(world.with_body(a, |body| body.position().y), Some(3.0));

    assert_eq!(world.finalize_pending(|_| panic!("nothing is queued")), 0);
}

#[test]
fn entities_can_be_removed_live_or_queued() {
    let world = World::new();
    let model = primitives::cube(1.0, Color::WHITE);
    let live = world.enqueue(Entity::new(model.clone(), Body::new()));
    world.finalize_pending(|_| {});
    let queued = world.enqueue(Entity::new(model, Body::new()));

    assert!(world.remove(live));
    assert!(world.remove(queued));
    assert!(!world.remove(live));
    assert!(world.is_empty());
    assert_eq!(world.pending_len(), 0);
    assert!(world.with_body(live, |_| ()).is_none());
}

#[test]
fn entities_stay_reachable_while_being_finalized() {
    init_logger();
    let world = World::new();
    let model = primitives::cube(1.0, Color::WHITE);
    let doomed = world.enqueue(Entity::new(model.clone(), Body::new()));
    let kept = world.enqueue(Entity::new(model.clone(), Body::new()));

    let mut removed = None;
    let mut edited = None;
    let mut late = None;
    let count = world.finalize_pending(|entity| {
        if entity.id() == doomed {
            removed = Some(world.remove(doomed));
            edited = world.with_body(kept, |body| body.set_position(Vec3::new(0.0, 2.0, 0.0)));
            late = Some(world.enqueue(Entity::new(model.clone(), Body::new())));
        }
    });

    assert_eq!(removed, Some(true));
    assert!(edited.is_some());
    assert_eq!(count, 1);
    assert_eq!(world.len(), 1);
    assert!(world.with_body(doomed, |_| ()).is_none());
    assert_eq!(world.with_body(kept, |body| body.position().y), Some(2.0));

    // queued during finalization, so it waits for the next one
    let late = late.expect("enqueued inside prepare");
    assert_eq!(world.pending_len(), 1);
    assert_eq!(world.finalize_pending(|_| {}), 1);
    assert!(world.with_body(late, |_| ()).is_some());
    assert_eq!(world.len(), 2);
}

#[test]
fn entities_share_models_but_not_bodies() {
    let world = World::new();
    let model = primitives::cube(2.0, Color::GRAY);
    world.enqueue(Entity::new(model.clone(), Body::new()));
    world.enqueue(Entity::new(model.clone(), Body::new().with_position(Vec3::new(1.0, 0.0, 0.0))));
    world.finalize_pending(|_| {});

    world.with_entities(|entities| {
        assert!(Arc::ptr_eq(entities[0].model(), entities[1].model()));
        assert_ne!(entities[0].body.position(), entities[1].body.position());
    });
    assert_eq!(Arc::strong_count(&model), 3);
}

#[test]
fn entities_can_be_created_from_many_threads() {
    let engine = Engine::new(EngineConfig::default());
    let model = primitives::cube(1.0, Color::WHITE);

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let engine = engine.clone();
            let model = model.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let body = Body::new().with_position(Vec3::new(t as f64, i as f64, 0.0));
                        engine.create_entity(model.clone(), body)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().expect("creator thread"))
        .collect();

    assert_eq!(engine.world().pending_len(), 100);
    engine.step(DT);
    assert_eq!(engine.world().len(), 100);

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 100);
}

#[test]
fn engine_step_applies_registered_forces() {
    let engine = Engine::new(EngineConfig::default());
    let model = primitives::cube(1.0, Color::WHITE);
    let falling = engine.create_entity(model.clone(), Body::new());
    let anchored = engine.create_entity(model, Body::fixed());
    engine.physics().add_global_force_generator(Arc::new(Gravity::new(Vec3::new(0.0, -10.0, 0.0))));

    engine.step(DT);

    let v = engine.with_body(falling, |b| b.velocity()).expect("live entity");
    assert_close(v.y, -10.0 * DT, 1e-12);
    let still = engine.with_body(anchored, |b| b.velocity()).expect("live entity");
    assert_eq!(still, Vec3::zero());
}

#[test]
fn removing_an_entity_drops_its_registrations() {
    let engine = Engine::new(EngineConfig::default());
    let model = primitives::cube(1.0, Color::WHITE);
    let kept = engine.create_entity(model.clone(), Body::new());
    let gone = engine.create_entity(model, Body::new());
    engine.step(DT);

    let push: Arc<dyn ForceGenerator> = Arc::new(ConstantForce::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zero()));
    engine.physics().add_force_generator(push.clone(), kept);
    engine.physics().add_force_generator(push, gone);
    assert_eq!(engine.physics().registration_count(), 2);

    assert!(engine.remove_entity(gone));
    assert_eq!(engine.physics().registration_count(), 1);
    assert_eq!(engine.world().len(), 1);
    assert!(engine.with_body(gone, |_| ()).is_none());
}

#[test]
fn shutdown_is_visible_to_every_handle() {
    let engine = Engine::new(EngineConfig::default());
    let other = engine.clone();
    assert!(!other.is_stopped());
    thread::spawn(move || engine.shutdown()).join().expect("stopping thread");
    assert!(other.is_stopped());
}

#[test]
fn config_defaults_and_setters() {
    let config = EngineConfig::default();
    assert_eq!((config.width, config.height), (1024, 768));
    assert_eq!(config.sample_count, 4);
    assert_eq!(config.update_period(), instant::Duration::from_secs_f64(1.0 / 60.0));
    assert_eq!(config.ssao.occlusion_range, [0.25, 0.5]);
    assert_eq!(config.ssao.kernel_size(), 16);
    assert_eq!(config.geometry_clear, Color::CORNFLOWER_BLUE);

    let config = EngineConfig::default()
        .with_title("demo")
        .with_size(640, 480)
        .with_rates(0, 120)
        .with_sample_count(1)
        .with_clip_planes(1.0, 50.0)
        .with_ssao(SsaoConfig {
            kernel_size: 500,
            ..SsaoConfig::default()
        })
        .with_debug_gbuffer(true);
    assert_eq!(config.title, "demo");
    assert_eq!(config.update_rate, 1);
    assert_eq!(config.render_period(), instant::Duration::from_secs_f64(1.0 / 120.0));
    assert_eq!((config.znear, config.zfar), (1.0, 50.0));
    assert_eq!(config.ssao.kernel_size(), SsaoConfig::MAX_KERNEL_SIZE);
    assert!(config.debug_gbuffer);
}
