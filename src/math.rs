//! Math aliases and the few helpers cgmath does not ship.
//!
//! Physics runs in double precision, rendering in single precision.

use cgmath::{InnerSpace, Rad, Rotation3};

pub type Vec3 = cgmath::Vector3<f64>;
pub type Quat = cgmath::Quaternion<f64>;
pub type Mat3 = cgmath::Matrix3<f64>;
pub type Mat4 = cgmath::Matrix4<f64>;

pub const UP: cgmath::Vector3<f32> = cgmath::Vector3::new(0.0, 1.0, 0.0);
/// Cameras and bodies look down negative z.
pub const FORWARDS: cgmath::Vector3<f32> = cgmath::Vector3::new(0.0, 0.0, -1.0);

/// cgmath builds OpenGL clip space (z in [-w, w]); wgpu expects z in [0, w].
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Rotation of `|v|` radians about `v`. The zero vector maps to identity.
pub fn quat_from_scaled_axis(v: Vec3) -> Quat {
    let angle = v.magnitude();
    if angle <= f64::EPSILON {
        return Quat::new(1.0, 0.0, 0.0, 0.0);
    }
    Quat::from_axis_angle(v / angle, Rad(angle))
}

pub fn is_finite_vec3(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

pub fn is_finite_quat(q: Quat) -> bool {
    q.s.is_finite() && is_finite_vec3(q.v)
}

/// Narrow a double precision transform for upload.
pub fn to_f32_matrix(m: Mat4) -> cgmath::Matrix4<f32> {
    m.cast::<f32>().unwrap_or_else(cgmath::SquareMatrix::identity)
}

/// Linear RGBA colour as uploaded to shaders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const GRAY: Color = Color::rgb(0.5, 0.5, 0.5);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const CORNFLOWER_BLUE: Color = Color::rgb(0.392, 0.584, 0.929);
    pub const BLUE_VIOLET: Color = Color::rgb(0.541, 0.169, 0.886);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl From<Color> for wgpu::Color {
    fn from(c: Color) -> Self {
        wgpu::Color {
            r: c.r as f64,
            g: c.g as f64,
            b: c.b as f64,
            a: c.a as f64,
        }
    }
}

impl From<[f32; 4]> for Color {
    fn from(v: [f32; 4]) -> Self {
        Color::rgba(v[0], v[1], v[2], v[3])
    }
}
