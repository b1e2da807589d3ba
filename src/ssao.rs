//! Screen-space ambient occlusion.
//!
//! `composite.wgsl` estimates occlusion per pixel and per multi-sample from
//! the depth, normal and tangent attachments. This module is the same
//! estimator on the CPU, over anything implementing [`GBufferSource`], so the
//! policy can be checked without a GPU. Both sides share the kernel hash and
//! depth linearization below bit for bit.
//!
//! Occlusion is `sqrt(hits / valid)` where each hit is weighted by the ratio
//! of occluder depth to sample depth; `1 - occlusion` is the accessibility.

use cgmath::{InnerSpace, Matrix3, Matrix4, SquareMatrix, Vector2, Vector3, Vector4};

use crate::{
    camera::{Camera, Projection},
    config::SsaoConfig,
    math::Color,
};

const MIN_KERNEL_Z: f32 = 0.1;
const MIN_SAMPLE_W: f32 = 1e-6;

/// View-space distance of a depth-buffer value in [0, 1].
pub fn linearize_depth(depth: f32, near: f32, far: f32) -> f32 {
    near * far / (far - depth * (far - near))
}

/// Linear depth normalized by `far`, from an OpenGL style NDC depth in
/// [-1, 1]. Equal to `linearize_depth(d) / far` for `ndc_z = 2d - 1`.
pub fn linearize_ndc_depth(ndc_z: f32, near: f32, far: f32) -> f32 {
    2.0 * near / (far + near - ndc_z * (far - near))
}

/// World-space position behind a texel. `uv` has y pointing down.
pub fn reconstruct_position(
    uv: Vector2<f32>,
    depth: f32,
    inverse_projection: &Matrix4<f32>,
    inverse_view: &Matrix4<f32>,
) -> Vector3<f32> {
    let clip = Vector4::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, depth, 1.0);
    let view = inverse_projection * clip;
    let view = view / view.w;
    (inverse_view * view).truncate()
}

fn hash(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

fn random(pixel: [u32; 2], index: u32, component: u32) -> f32 {
    let h = hash(pixel[0] ^ hash(pixel[1] ^ hash(index.wrapping_mul(4).wrapping_add(component))));
    (h >> 8) as f32 / 16_777_216.0
}

/// Tangent-space kernel vector `index` of `kernel_size` for a pixel.
///
/// Pure in its inputs. Vectors lie in the +z hemisphere, are never zero and
/// grow quadratically towards the end of the kernel.
pub fn kernel_sample(pixel: [u32; 2], index: u32, kernel_size: u32) -> Vector3<f32> {
    let x = random(pixel, index, 0) * 2.0 - 1.0;
    let y = random(pixel, index, 1) * 2.0 - 1.0;
    let z = random(pixel, index, 2).max(MIN_KERNEL_Z);
    let length = random(pixel, index, 3) * 0.9 + 0.1;

    let v = Vector3::new(x, y, z);
    // z is at least MIN_KERNEL_Z, so v is never degenerate
    let v = v / v.magnitude();
    let t = index as f32 / kernel_size.max(1) as f32;
    let scale = 0.1 + 0.9 * t * t;
    v * length * scale
}

pub fn kernel(pixel: [u32; 2], kernel_size: u32) -> Vec<Vector3<f32>> {
    (0..kernel_size).map(|i| kernel_sample(pixel, i, kernel_size)).collect()
}

/// Per-sample read access to the attachments the estimator needs.
pub trait GBufferSource {
    fn size(&self) -> (u32, u32);
    fn sample_count(&self) -> u32;
    fn depth(&self, x: u32, y: u32, sample: u32) -> f32;
    fn normal(&self, x: u32, y: u32, sample: u32) -> Vector3<f32>;
    fn tangent(&self, x: u32, y: u32, sample: u32) -> Vector3<f32>;
}

/// A G-buffer held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct GBufferImage {
    width: u32,
    height: u32,
    samples: u32,
    depth: Vec<f32>,
    normal: Vec<Vector3<f32>>,
    tangent: Vec<Vector3<f32>>,
}

impl GBufferImage {
    /// Every texel starts at the far plane facing +z.
    pub fn new(width: u32, height: u32, samples: u32) -> Self {
        let len = (width * height * samples.max(1)) as usize;
        Self {
            width,
            height,
            samples: samples.max(1),
            depth: vec![1.0; len],
            normal: vec![Vector3::unit_z(); len],
            tangent: vec![Vector3::unit_x(); len],
        }
    }

    fn offset(&self, x: u32, y: u32, sample: u32) -> usize {
        ((y * self.width + x) * self.samples + sample) as usize
    }

    pub fn set(
        &mut self,
        x: u32,
        y: u32,
        sample: u32,
        depth: f32,
        normal: Vector3<f32>,
        tangent: Vector3<f32>,
    ) {
        let i = self.offset(x, y, sample);
        self.depth[i] = depth;
        self.normal[i] = normal;
        self.tangent[i] = tangent;
    }

    /// Set all multi-samples of a texel.
    pub fn set_texel(&mut self, x: u32, y: u32, depth: f32, normal: Vector3<f32>, tangent: Vector3<f32>) {
        for s in 0..self.samples {
            self.set(x, y, s, depth, normal, tangent);
        }
    }
}

impl GBufferSource for GBufferImage {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn sample_count(&self) -> u32 {
        self.samples
    }

    fn depth(&self, x: u32, y: u32, sample: u32) -> f32 {
        self.depth[self.offset(x, y, sample)]
    }

    fn normal(&self, x: u32, y: u32, sample: u32) -> Vector3<f32> {
        self.normal[self.offset(x, y, sample)]
    }

    fn tangent(&self, x: u32, y: u32, sample: u32) -> Vector3<f32> {
        self.tangent[self.offset(x, y, sample)]
    }
}

/// Matrices and clip planes the estimator reprojects with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsaoView {
    pub view_projection: Matrix4<f32>,
    pub inverse_projection: Matrix4<f32>,
    pub inverse_view: Matrix4<f32>,
    pub near: f32,
    pub far: f32,
}

impl SsaoView {
    pub fn new(camera: &Camera, projection: &Projection) -> Self {
        let view = camera.view_matrix();
        let proj = projection.calc_matrix();
        Self {
            view_projection: proj * view,
            inverse_projection: projection.inverse_matrix(),
            inverse_view: view.invert().unwrap_or_else(Matrix4::identity),
            near: projection.znear(),
            far: projection.zfar(),
        }
    }
}

/// Occlusion of one multi-sample of a pixel, in [0, 1].
pub fn estimate_sample(
    source: &impl GBufferSource,
    view: &SsaoView,
    params: &SsaoConfig,
    x: u32,
    y: u32,
    sample: u32,
) -> f32 {
    let (width, height) = source.size();
    let depth = source.depth(x, y, sample);
    // nothing was drawn here
    if depth >= 1.0 {
        return 0.0;
    }

    let n = source.normal(x, y, sample);
    if n.magnitude2() < 1e-12 {
        return 0.0;
    }
    let n = n.normalize();
    let t = tangent_basis(n, source.tangent(x, y, sample));
    let tbn = Matrix3::from_cols(t, n.cross(t), n);

    let uv = Vector2::new(
        (x as f32 + 0.5) / width as f32,
        (y as f32 + 0.5) / height as f32,
    );
    let origin = reconstruct_position(uv, depth, &view.inverse_projection, &view.inverse_view);

    let kernel_size = params.kernel_size();
    let mut occluded = 0.0;
    let mut valid = 0u32;
    for i in 0..kernel_size {
        let offset = tbn * kernel_sample([x, y], i, kernel_size);
        let point = origin + offset * params.radius;
        let clip = view.view_projection * point.extend(1.0);
        if clip.w.abs() < MIN_SAMPLE_W {
            continue;
        }
        let ndc = clip.truncate() / clip.w;
        let su = ndc.x * 0.5 + 0.5;
        let sv = 0.5 - ndc.y * 0.5;
        if !(0.0..1.0).contains(&su) || !(0.0..1.0).contains(&sv) || !(0.0..=1.0).contains(&ndc.z) {
            continue;
        }

        let px = ((su * width as f32) as u32).min(width - 1);
        let py = ((sv * height as f32) as u32).min(height - 1);
        let scene = linearize_depth(source.depth(px, py, sample), view.near, view.far);
        let sampled = linearize_depth(ndc.z, view.near, view.far);
        valid += 1;

        let difference = sampled - scene;
        if difference > params.bias && difference < params.depth_tolerance {
            occluded += scene / sampled;
        }
    }

    if valid == 0 {
        return 0.0;
    }
    (occluded / valid as f32).sqrt()
}

/// Occlusion of a pixel, averaged over its multi-samples.
pub fn estimate(
    source: &impl GBufferSource,
    view: &SsaoView,
    params: &SsaoConfig,
    x: u32,
    y: u32,
) -> f32 {
    let samples = source.sample_count().max(1);
    let total: f32 = (0..samples)
        .map(|s| estimate_sample(source, view, params, x, y, s))
        .sum();
    total / samples as f32
}

/// Darken `color` by `occlusion` clamped to `range`. Alpha is kept.
pub fn apply_occlusion(color: Color, occlusion: f32, range: [f32; 2]) -> Color {
    let factor = 1.0 - occlusion.clamp(range[0], range[1]);
    Color::rgba(color.r * factor, color.g * factor, color.b * factor, color.a)
}

fn tangent_basis(n: Vector3<f32>, t: Vector3<f32>) -> Vector3<f32> {
    let t = t - n * n.dot(t);
    if t.magnitude2() > 1e-12 {
        return t.normalize();
    }
    let axis = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    (axis - n * n.dot(axis)).normalize()
}
