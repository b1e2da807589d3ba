use cgmath::{InnerSpace, Matrix4, SquareMatrix, Zero};

use crate::{
    error::{Error, Result},
    math::{Mat3, Mat4, Quat, Vec3, is_finite_quat, is_finite_vec3, quat_from_scaled_axis},
};

/// Rigid-body state of an entity.
///
/// Mass is stored as its inverse: an inverse mass of zero is an immovable
/// body. The inertia tensor is stored inverted as well and applied to torque
/// directly. Accumulators collect forces from generators and are cleared by
/// every call to [`Body::integrate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    position: Vec3,
    orientation: Quat,
    velocity: Vec3,
    angular_velocity: Quat,
    inverse_mass: f64,
    inverse_inertia_tensor: Mat3,
    force_accumulator: Vec3,
    torque_accumulator: Vec3,
    transform: Mat4,
}

impl Body {
    /// Unit mass at the origin, identity orientation, at rest.
    pub fn new() -> Self {
        Self {
            position: Vec3::zero(),
            orientation: Quat::new(1.0, 0.0, 0.0, 0.0),
            velocity: Vec3::zero(),
            angular_velocity: Quat::new(1.0, 0.0, 0.0, 0.0),
            inverse_mass: 1.0,
            inverse_inertia_tensor: Mat3::identity(),
            force_accumulator: Vec3::zero(),
            torque_accumulator: Vec3::zero(),
            transform: Mat4::identity(),
        }
    }

    /// A static body: infinite mass and inertia, never moved by forces.
    pub fn fixed() -> Self {
        Self {
            inverse_mass: 0.0,
            inverse_inertia_tensor: Mat3::zero(),
            ..Self::new()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn angular_velocity(&self) -> Quat {
        self.angular_velocity
    }

    pub fn force_accumulator(&self) -> Vec3 {
        self.force_accumulator
    }

    pub fn torque_accumulator(&self) -> Vec3 {
        self.torque_accumulator
    }

    pub fn inverse_mass(&self) -> f64 {
        self.inverse_mass
    }

    /// Infinite for static bodies.
    pub fn mass(&self) -> f64 {
        if self.inverse_mass != 0.0 {
            1.0 / self.inverse_mass
        } else {
            f64::INFINITY
        }
    }

    /// World transform as of the last integration: translation then rotation.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Rejects zero, negative and non-finite masses. Use [`Body::fixed`] or
    /// [`Body::set_inverse_mass`] with `0.0` for immovable bodies.
    pub fn set_mass(&mut self, mass: f64) -> Result<()> {
        if !mass.is_finite() || mass <= 0.0 {
            log::warn!("rejected mass {}", mass);
            return Err(Error::InvalidMass(mass));
        }
        self.inverse_mass = 1.0 / mass;
        Ok(())
    }

    pub fn set_inverse_mass(&mut self, inverse_mass: f64) -> Result<()> {
        if !inverse_mass.is_finite() || inverse_mass < 0.0 {
            log::warn!("rejected inverse mass {}", inverse_mass);
            return Err(Error::InvalidInverseMass(inverse_mass));
        }
        self.inverse_mass = inverse_mass;
        Ok(())
    }

    /// Takes the body-local inertia tensor and stores its inverse.
    pub fn set_inertia_tensor(&mut self, tensor: Mat3) -> Result<()> {
        let inverse = tensor.invert().ok_or(Error::SingularInertiaTensor)?;
        self.inverse_inertia_tensor = inverse;
        Ok(())
    }

    pub fn set_inverse_inertia_tensor(&mut self, inverse: Mat3) {
        self.inverse_inertia_tensor = inverse;
    }

    pub fn inverse_inertia_tensor(&self) -> Mat3 {
        self.inverse_inertia_tensor
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_transform();
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    /// Normalised on the way in; a zero quaternion is ignored.
    pub fn set_orientation(&mut self, orientation: Quat) {
        if orientation.magnitude2() <= f64::MIN_POSITIVE || !is_finite_quat(orientation) {
            log::warn!("ignored degenerate orientation {:?}", orientation);
            return;
        }
        self.orientation = orientation.normalize();
        self.update_transform();
    }

    pub fn set_angular_velocity(&mut self, angular_velocity: Quat) {
        self.angular_velocity = angular_velocity;
    }

    /// Force through the centre of mass.
    pub fn add_force(&mut self, force: Vec3) {
        if is_finite_vec3(force) {
            self.force_accumulator += force;
        } else {
            log::warn!("ignored non-finite force {:?}", force);
        }
    }

    pub fn add_torque(&mut self, torque: Vec3) {
        if is_finite_vec3(torque) {
            self.torque_accumulator += torque;
        } else {
            log::warn!("ignored non-finite torque {:?}", torque);
        }
    }

    /// Force applied at `point`, producing both linear and angular response.
    /// With `local` set the point is in body space and goes through the
    /// current world transform first.
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3, local: bool) {
        let point = if local {
            (self.transform * point.extend(1.0)).truncate()
        } else {
            point
        };
        self.add_force(force);
        self.add_torque((point - self.position).cross(force));
    }

    /// Advance the body by `dt` seconds with symplectic Euler.
    ///
    /// Velocity is updated before position. Angular velocity composes
    /// multiplicatively with the rotation produced by the angular
    /// acceleration, the orientation is renormalised, both accumulators are
    /// cleared and the world transform recomputed. A step that would
    /// produce non-finite state is discarded.
    pub fn integrate(&mut self, dt: f64) {
        if dt.is_finite() && dt > 0.0 {
            let previous = (
                self.position,
                self.velocity,
                self.orientation,
                self.angular_velocity,
            );

            let acceleration = if self.inverse_mass == 0.0 {
                Vec3::zero()
            } else {
                self.force_accumulator * self.inverse_mass
            };
            self.velocity += acceleration * dt;

            let angular_acceleration = self.inverse_inertia_tensor * self.torque_accumulator;
            self.angular_velocity =
                self.angular_velocity * quat_from_scaled_axis(angular_acceleration * dt);

            self.position += self.velocity * dt;

            let spun = self.orientation * (self.angular_velocity * dt);
            if spun.magnitude2() > f64::MIN_POSITIVE {
                self.orientation = spun.normalize();
            }

            if !(is_finite_vec3(self.position)
                && is_finite_vec3(self.velocity)
                && is_finite_quat(self.orientation)
                && is_finite_quat(self.angular_velocity))
            {
                log::warn!("discarded non-finite integration step (dt = {})", dt);
                (self.position, _, self.orientation, _) = previous;
                self.velocity = Vec3::zero();
                self.angular_velocity = Quat::new(1.0, 0.0, 0.0, 0.0);
            }
        }

        self.force_accumulator = Vec3::zero();
        self.torque_accumulator = Vec3::zero();
        self.update_transform();
    }

    fn update_transform(&mut self) {
        self.transform = Matrix4::from_translation(self.position) * Matrix4::from(self.orientation);
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}
