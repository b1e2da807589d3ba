use std::sync::{Arc, Mutex};

use cgmath::{InnerSpace, Matrix3, SquareMatrix, Zero};
use lux_ngin::{
    Error,
    math::{Color, Mat3, Vec3},
    physics::{
        PhysicsEngine,
        body::Body,
        forces::{ConstantForce, ForceGenerator, Gravity},
    },
    resources::primitives,
    world::{Entity, EntityId, World},
};

use crate::common::test_utils::{assert_close, assert_vec3_close, init_logger};

mod common;

const DT: f64 = 1.0 / 60.0;

fn world_with(bodies: Vec<Body>) -> (World, Vec<EntityId>) {
    let world = World::new();
    let model = primitives::cube(1.0, Color::WHITE);
    let ids = bodies
        .into_iter()
        .map(|body| world.enqueue(Entity::new(model.clone(), body)))
        .collect();
    world.finalize_pending(|_| {});
    (world, ids)
}

fn body_of(world: &World, id: EntityId) -> Body {
    world.with_body(id, |b| b.clone()).expect("entity is live")
}

#[test]
fn gravity_over_one_second_matches_symplectic_euler() {
    init_logger();
    let (world, ids) = world_with(vec![Body::new()]);
    let physics = PhysicsEngine::new();
    physics.add_global_force_generator(Arc::new(Gravity::new(Vec3::new(0.0, -9.8, 0.0))));

    for _ in 0..60 {
        physics.step(&world, DT);
    }

    let body = body_of(&world, ids[0]);
    assert_vec3_close(body.velocity(), Vec3::new(0.0, -9.8, 0.0), 1e-9);
    // sum of k * dt^2 * g for k in 1..=60
    assert_close(body.position().y, -9.8 * 1830.0 / 3600.0, 1e-9);
    assert_close(body.position().x, 0.0, 1e-12);
    assert_close(body.position().z, 0.0, 1e-12);
    // transform follows the position
    assert_close(body.transform().w.y, body.position().y, 1e-12);
}

#[test]
fn removed_generator_contributes_only_before_removal() {
    let (world, ids) = world_with(vec![Body::new()]);
    let physics = PhysicsEngine::new();
    let push: Arc<dyn ForceGenerator> = Arc::new(ConstantForce::new(Vec3::new(1.0, 0.0, 0.0), Vec3::zero()));
    physics.add_force_generator(push.clone(), ids[0]);

    physics.step(&world, DT);
    let after_first = body_of(&world, ids[0]).velocity();
    assert_close(after_first.x, DT, 1e-12);

    physics.remove_force_generator(&push);
    assert_eq!(physics.registration_count(), 0);
    physics.step(&world, DT);
    assert_vec3_close(body_of(&world, ids[0]).velocity(), after_first, 1e-15);
}

#[test]
fn generators_run_in_registration_order_then_globals() {
    let (world, ids) = world_with(vec![Body::new(), Body::new()]);
    let physics = PhysicsEngine::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    for (label, id) in [("a", ids[1]), ("b", ids[0]), ("c", ids[1])] {
        let calls = calls.clone();
        physics.add_force_generator(
            Arc::new(move |_: &mut Body, _: f64| calls.lock().unwrap().push(label)),
            id,
        );
    }
    let global_calls = calls.clone();
    physics.add_global_force_generator(Arc::new(move |_: &mut Body, _: f64| {
        global_calls.lock().unwrap().push("global")
    }));

    physics.step(&world, DT);
    assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c", "global", "global"]);

    calls.lock().unwrap().clear();
    physics.step(&world, DT);
    assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c", "global", "global"]);
}

#[test]
fn removing_one_pair_keeps_other_bindings() {
    let (world, ids) = world_with(vec![Body::new(), Body::new()]);
    let physics = PhysicsEngine::new();
    let push: Arc<dyn ForceGenerator> = Arc::new(ConstantForce::new(Vec3::new(0.0, 0.0, 2.0), Vec3::zero()));
    physics.add_force_generator(push.clone(), ids[0]);
    physics.add_force_generator(push.clone(), ids[1]);

    physics.remove_force_generator_from(&push, ids[0]);
    assert_eq!(physics.registration_count(), 1);
    physics.step(&world, DT);

    assert_vec3_close(body_of(&world, ids[0]).velocity(), Vec3::zero(), 0.0);
    assert_close(body_of(&world, ids[1]).velocity().z, 2.0 * DT, 1e-12);
}

#[test]
fn global_generators_can_be_removed() {
    let (world, ids) = world_with(vec![Body::new()]);
    let physics = PhysicsEngine::new();
    let gravity: Arc<dyn ForceGenerator> = Arc::new(Gravity::earth());
    physics.add_global_force_generator(gravity.clone());
    assert_eq!(physics.global_count(), 1);
    physics.remove_global_force_generator(&gravity);
    assert_eq!(physics.global_count(), 0);

    physics.step(&world, DT);
    assert_vec3_close(body_of(&world, ids[0]).velocity(), Vec3::zero(), 0.0);
}

#[test]
fn generator_may_unregister_during_a_step() {
    let (world, ids) = world_with(vec![Body::new()]);
    let physics = Arc::new(PhysicsEngine::new());
    let id = ids[0];
    let registry = Arc::downgrade(&physics);
    physics.add_force_generator(
        Arc::new(move |body: &mut Body, _: f64| {
            body.add_force(Vec3::new(0.0, 1.0, 0.0));
            if let Some(registry) = registry.upgrade() {
                registry.forget_entity(id);
            }
        }),
        id,
    );

    physics.step(&world, DT);
    assert_eq!(physics.registration_count(), 0);
    physics.step(&world, DT);
    assert_close(body_of(&world, id).velocity().y, DT, 1e-12);
}

#[test]
fn fixed_body_never_moves() {
    let (world, ids) = world_with(vec![Body::fixed().with_position(Vec3::new(1.0, 2.0, 3.0))]);
    let physics = PhysicsEngine::new();
    physics.add_global_force_generator(Arc::new(Gravity::earth()));
    physics.add_force_generator(
        Arc::new(ConstantForce::new(Vec3::new(1e6, -1e6, 5.0), Vec3::new(3.0, 0.0, 1.0))),
        ids[0],
    );

    for _ in 0..120 {
        physics.step(&world, DT);
    }

    let body = body_of(&world, ids[0]);
    assert_vec3_close(body.position(), Vec3::new(1.0, 2.0, 3.0), 0.0);
    assert_vec3_close(body.velocity(), Vec3::zero(), 0.0);
    assert!(body.mass().is_infinite());
}

#[test]
fn integrate_clears_accumulators() {
    let mut body = Body::new();
    body.add_force(Vec3::new(4.0, 5.0, 6.0));
    body.add_torque(Vec3::new(0.1, 0.2, 0.3));
    body.apply_force_at_point(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), false);
    body.integrate(DT);
    assert_eq!(body.force_accumulator(), Vec3::zero());
    assert_eq!(body.torque_accumulator(), Vec3::zero());

    // a rejected step still clears them
    body.add_force(Vec3::new(1.0, 0.0, 0.0));
    body.integrate(0.0);
    assert_eq!(body.force_accumulator(), Vec3::zero());
}

#[test]
fn force_at_point_adds_torque() {
    let mut body = Body::new().with_position(Vec3::new(1.0, 0.0, 0.0));
    body.apply_force_at_point(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 0.0, 0.0), false);
    assert_vec3_close(body.force_accumulator(), Vec3::new(0.0, 1.0, 0.0), 1e-12);
    assert_vec3_close(body.torque_accumulator(), Vec3::new(0.0, 0.0, 1.0), 1e-12);

    let mut local = Body::new().with_position(Vec3::new(1.0, 0.0, 0.0));
    local.apply_force_at_point(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0), true);
    assert_vec3_close(local.torque_accumulator(), Vec3::new(0.0, 0.0, 1.0), 1e-12);
}

#[test]
fn orientation_stays_unit_length() {
    let mut body = Body::new();
    body.set_inertia_tensor(Matrix3::from_diagonal(Vec3::new(1.0, 2.0, 0.5)))
        .expect("tensor is invertible");
    for i in 0..2000 {
        body.add_torque(Vec3::new(0.3, 1.0, -0.2) * ((i % 7) as f64 - 3.0));
        body.integrate(DT);
        assert_close(body.orientation().magnitude(), 1.0, 1e-9);
    }
}

#[test]
fn torque_spins_the_body() {
    let mut body = Body::new();
    body.add_torque(Vec3::new(0.0, 1.0, 0.0));
    body.integrate(DT);
    let forward = body.transform() * cgmath::Vector4::new(0.0, 0.0, -1.0, 0.0);
    assert!(forward.x.abs() > 0.0, "the body did not turn: {:?}", forward);
}

#[test]
fn trajectories_are_deterministic() {
    let run = || {
        let (world, ids) = world_with(vec![Body::new(), Body::new().with_position(Vec3::new(0.0, 5.0, 0.0))]);
        let physics = PhysicsEngine::new();
        physics.add_global_force_generator(Arc::new(Gravity::earth()));
        physics.add_force_generator(
            Arc::new(ConstantForce::new(Vec3::new(0.5, 0.0, 0.25), Vec3::new(0.0, 0.3, 0.1))),
            ids[1],
        );
        for _ in 0..300 {
            physics.step(&world, DT);
        }
        ids.iter().map(|id| body_of(&world, *id)).collect::<Vec<_>>()
    };

    assert_eq!(run(), run());
}

#[test]
fn invalid_masses_are_rejected() {
    init_logger();
    let mut body = Body::new();
    for mass in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(body.set_mass(mass), Err(Error::InvalidMass(_))));
    }
    assert_eq!(body.inverse_mass(), 1.0);

    assert!(matches!(body.set_inverse_mass(-2.0), Err(Error::InvalidInverseMass(_))));
    body.set_mass(4.0).expect("positive mass");
    assert_close(body.inverse_mass(), 0.25, 0.0);
    body.set_inverse_mass(0.0).expect("zero inverse mass is a static body");
    assert!(body.mass().is_infinite());
}

#[test]
fn singular_inertia_tensor_is_rejected() {
    let mut body = Body::new();
    let singular = Matrix3::from_diagonal(Vec3::new(1.0, 0.0, 1.0));
    assert!(matches!(body.set_inertia_tensor(singular), Err(Error::SingularInertiaTensor)));
    assert_eq!(body.inverse_inertia_tensor(), Mat3::identity());

    body.set_inertia_tensor(Matrix3::from_diagonal(Vec3::new(2.0, 4.0, 8.0)))
        .expect("tensor is invertible");
    assert_eq!(
        body.inverse_inertia_tensor(),
        Matrix3::from_diagonal(Vec3::new(0.5, 0.25, 0.125))
    );
}

#[test]
fn non_finite_input_never_reaches_the_transform() {
    init_logger();
    let mut body = Body::new();
    body.add_force(Vec3::new(f64::NAN, 0.0, 0.0));
    body.add_torque(Vec3::new(0.0, f64::INFINITY, 0.0));
    assert_eq!(body.force_accumulator(), Vec3::zero());
    assert_eq!(body.torque_accumulator(), Vec3::zero());

    body.add_force(Vec3::new(f64::MAX, 0.0, 0.0));
    body.add_force(Vec3::new(f64::MAX, 0.0, 0.0));
    body.integrate(DT);
    assert_vec3_close(body.position(), Vec3::zero(), 0.0);
    assert_vec3_close(body.velocity(), Vec3::zero(), 0.0);

    body.integrate(f64::NAN);
    assert!(body.transform().x.x.is_finite());
}
