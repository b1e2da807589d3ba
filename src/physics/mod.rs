//! Force accumulation and rigid-body integration.
//!
//! One physics step applies every per-entity registration, then every global
//! generator to every live entity, then integrates each entity exactly once.
//! No collision detection or response happens here.

pub mod body;
pub mod forces;

use std::sync::{Arc, Mutex};

use crate::{
    physics::forces::{ForceGenerator, same_generator},
    sync::lock,
    world::{EntityId, World},
};

#[derive(Clone)]
struct Registration {
    generator: Arc<dyn ForceGenerator>,
    entity: EntityId,
}

/// Registry of force generators.
///
/// Mutation may happen from any thread. A step snapshots both registries
/// before running generators, so a removal during a step takes effect on the
/// next one and generators may touch the registry themselves.
#[derive(Default)]
pub struct PhysicsEngine {
    registrations: Mutex<Vec<Registration>>,
    globals: Mutex<Vec<Arc<dyn ForceGenerator>>>,
}

impl PhysicsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_force_generator(&self, generator: Arc<dyn ForceGenerator>, entity: EntityId) {
        lock(&self.registrations).push(Registration { generator, entity });
    }

    /// Unregister `generator` from every entity it was bound to.
    pub fn remove_force_generator(&self, generator: &Arc<dyn ForceGenerator>) {
        lock(&self.registrations).retain(|r| !same_generator(&r.generator, generator));
    }

    /// Unregister one (generator, entity) pair.
    pub fn remove_force_generator_from(&self, generator: &Arc<dyn ForceGenerator>, entity: EntityId) {
        lock(&self.registrations)
            .retain(|r| !(same_generator(&r.generator, generator) && r.entity == entity));
    }

    pub fn add_global_force_generator(&self, generator: Arc<dyn ForceGenerator>) {
        lock(&self.globals).push(generator);
    }

    pub fn remove_global_force_generator(&self, generator: &Arc<dyn ForceGenerator>) {
        lock(&self.globals).retain(|g| !same_generator(g, generator));
    }

    /// Drop every registration bound to `entity`.
    pub fn forget_entity(&self, entity: EntityId) {
        lock(&self.registrations).retain(|r| r.entity != entity);
    }

    pub fn registration_count(&self) -> usize {
        lock(&self.registrations).len()
    }

    pub fn global_count(&self) -> usize {
        lock(&self.globals).len()
    }

    /// Run one physics step of `dt` seconds over the live entities of `world`.
    pub fn step(&self, world: &World, dt: f64) {
        let registrations = lock(&self.registrations).clone();
        let globals = lock(&self.globals).clone();

        world.with_entities(|entities| {
            for registration in &registrations {
                // bound entities that are still queued or already gone are skipped
                if let Some(entity) = entities.iter_mut().find(|e| e.id() == registration.entity) {
                    registration.generator.update_force(&mut entity.body, dt);
                }
            }

            for generator in &globals {
                for entity in entities.iter_mut() {
                    generator.update_force(&mut entity.body, dt);
                }
            }

            for entity in entities.iter_mut() {
                entity.body.integrate(dt);
            }
        });
    }
}
