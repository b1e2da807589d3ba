//! Camera and projection.
//!
//! The camera holds yaw/pitch/roll and a position; the forward vector and
//! view matrix are derived on demand.

use cgmath::{Matrix3, Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};

use crate::math::{FORWARDS, OPENGL_TO_WGPU_MATRIX, UP};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
    pub roll: Rad<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>, Y: Into<Rad<f32>>, X: Into<Rad<f32>>, Z: Into<Rad<f32>>>(
        position: P,
        yaw: Y,
        pitch: X,
        roll: Z,
    ) -> Self {
        Self {
            position: position.into(),
            yaw: yaw.into(),
            pitch: pitch.into(),
            roll: roll.into(),
        }
    }

    /// Yaw about y, then pitch about x, then roll about z.
    pub fn rotation(&self) -> Matrix3<f32> {
        Matrix3::from_angle_y(self.yaw) * Matrix3::from_angle_x(self.pitch) * Matrix3::from_angle_z(self.roll)
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation() * FORWARDS
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation() * UP
    }

    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(self.up())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0), Rad(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    /// Perspective matrix mapping view depth to [0, 1].
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }

    pub fn inverse_matrix(&self) -> Matrix4<f32> {
        self.calc_matrix().invert().unwrap_or_else(Matrix4::identity)
    }
}
