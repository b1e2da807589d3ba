use std::sync::Arc;

use crate::{math::Vec3, physics::body::Body};

/// Something that pushes on bodies once per physics step.
///
/// Generators are shared between the registry and the caller, so they take
/// `&self`; generators that keep state use interior mutability.
pub trait ForceGenerator: Send + Sync {
    fn update_force(&self, body: &mut Body, dt: f64);
}

impl<F> ForceGenerator for F
where
    F: Fn(&mut Body, f64) + Send + Sync,
{
    fn update_force(&self, body: &mut Body, dt: f64) {
        self(body, dt)
    }
}

/// Identity comparison for registered generators (data pointer only).
pub(crate) fn same_generator(a: &Arc<dyn ForceGenerator>, b: &Arc<dyn ForceGenerator>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Uniform acceleration field, scaled by each body's mass.
#[derive(Debug, Clone, Copy)]
pub struct Gravity {
    pub acceleration: Vec3,
}

impl Gravity {
    pub fn new(acceleration: Vec3) -> Self {
        Self { acceleration }
    }

    /// Earth gravity along negative y.
    pub fn earth() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl ForceGenerator for Gravity {
    fn update_force(&self, body: &mut Body, _dt: f64) {
        // infinite mass would turn into an infinite force
        if body.inverse_mass() == 0.0 {
            return;
        }
        body.add_force(self.acceleration * body.mass());
    }
}

/// Fixed force and torque, independent of the body.
#[derive(Debug, Clone, Copy)]
pub struct ConstantForce {
    pub force: Vec3,
    pub torque: Vec3,
}

impl ConstantForce {
    pub fn new(force: Vec3, torque: Vec3) -> Self {
        Self { force, torque }
    }
}

impl ForceGenerator for ConstantForce {
    fn update_force(&self, body: &mut Body, _dt: f64) {
        body.add_force(self.force);
        body.add_torque(self.torque);
    }
}
