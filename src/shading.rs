//! Surface shading policy of the geometry pass.
//!
//! `geometry.wgsl` and the functions here implement the same rules: every
//! material has seven texture slots, an unbound slot samples a neutral value,
//! the bump map only perturbs the normal when it is bound and its sample
//! carries alpha, and fragments whose alpha map is opaque black are discarded.
//! Lighting is ambient + Lambert diffuse + Blinn specular from one point light.

use cgmath::{InnerSpace, Vector3, Zero};

use crate::{config::LightConfig, math::Color};

/// Material texture slots, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Ambient,
    Diffuse,
    Alpha,
    Bump,
    SpecularHighlight,
    Specular,
    StencilDecal,
}

impl TextureSlot {
    pub const COUNT: usize = 7;
    pub const ALL: [TextureSlot; Self::COUNT] = [
        TextureSlot::Ambient,
        TextureSlot::Diffuse,
        TextureSlot::Alpha,
        TextureSlot::Bump,
        TextureSlot::SpecularHighlight,
        TextureSlot::Specular,
        TextureSlot::StencilDecal,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TextureSlot::Ambient => "tex_ambient",
            TextureSlot::Diffuse => "tex_diffuse",
            TextureSlot::Alpha => "tex_alpha",
            TextureSlot::Bump => "tex_bump",
            TextureSlot::SpecularHighlight => "tex_specular_highlight",
            TextureSlot::Specular => "tex_specular",
            TextureSlot::StencilDecal => "tex_stencil_decal",
        }
    }

    /// Value sampled when nothing is bound to the slot.
    ///
    /// The bump default has zero alpha so it never perturbs the normal.
    pub fn neutral(self) -> Color {
        match self {
            TextureSlot::Ambient
            | TextureSlot::Diffuse
            | TextureSlot::Alpha
            | TextureSlot::SpecularHighlight => Color::WHITE,
            TextureSlot::Bump => Color::rgba(0.5, 0.5, 1.0, 0.0),
            TextureSlot::Specular => Color::GRAY,
            TextureSlot::StencilDecal => Color::TRANSPARENT,
        }
    }

    /// Colour maps are stored as sRGB, data maps linearly.
    pub fn is_srgb(self) -> bool {
        matches!(
            self,
            TextureSlot::Ambient | TextureSlot::Diffuse | TextureSlot::StencilDecal
        )
    }

    pub fn mask_bit(self) -> u32 {
        1 << self.index()
    }
}

/// Material constants multiplied into the sampled values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
    pub shininess: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            ambient: Color::WHITE,
            diffuse: Color::WHITE,
            specular: Color::WHITE,
            shininess: 10.0,
        }
    }
}

/// Texture samples of one fragment. `None` is an unbound slot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlotSamples([Option<Color>; TextureSlot::COUNT]);

impl SlotSamples {
    pub fn with(mut self, slot: TextureSlot, sample: Color) -> Self {
        self.0[slot.index()] = Some(sample);
        self
    }

    pub fn is_bound(&self, slot: TextureSlot) -> bool {
        self.0[slot.index()].is_some()
    }

    /// The bound sample, or the slot's neutral value.
    pub fn get(&self, slot: TextureSlot) -> Color {
        self.0[slot.index()].unwrap_or_else(|| slot.neutral())
    }
}

/// Interpolated inputs of one geometry-pass fragment, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub tangent: Vector3<f32>,
    pub samples: SlotSamples,
}

/// What the geometry pass writes for a fragment that survives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadedFragment {
    pub color: Color,
    pub normal: Vector3<f32>,
    pub tangent: Vector3<f32>,
}

pub fn is_cut_out(alpha: Color) -> bool {
    alpha.r < 0.5 && alpha.a == 1.0
}

/// Apply the bump sample to `normal` through the (tangent, normal x tangent,
/// normal) basis. Unbound or alpha-less samples return `normal` unchanged.
pub fn perturb_normal(
    normal: Vector3<f32>,
    tangent: Vector3<f32>,
    bump: Color,
    bound: bool,
) -> Vector3<f32> {
    let n = normalize_or(normal, Vector3::unit_z());
    if !bound || bump.a <= 0.0 {
        return n;
    }
    let t = orthogonal_tangent(n, tangent);
    let b = n.cross(t);
    let local = Vector3::new(bump.r * 2.0 - 1.0, bump.g * 2.0 - 1.0, bump.b * 2.0 - 1.0);
    normalize_or(t * local.x + b * local.y + n * local.z, n)
}

/// Shade one fragment. Returns `None` when the alpha map discards it.
pub fn shade(
    fragment: &Fragment,
    material: &MaterialParams,
    light: &LightConfig,
    eye: Vector3<f32>,
) -> Option<ShadedFragment> {
    let samples = &fragment.samples;
    if is_cut_out(samples.get(TextureSlot::Alpha)) {
        return None;
    }

    let normal = perturb_normal(
        fragment.normal,
        fragment.tangent,
        samples.get(TextureSlot::Bump),
        samples.is_bound(TextureSlot::Bump),
    );
    let to_light = normalize_or(light.position - fragment.position, normal);
    let to_eye = normalize_or(eye - fragment.position, normal);
    let half = normalize_or(to_light + to_eye, normal);

    let lambert = normal.dot(to_light).max(0.0);
    // specular is not gated on the diffuse term
    let blinn = normal.dot(half).max(0.0).powf(material.shininess.max(0.0));

    let decal = samples.get(TextureSlot::StencilDecal);
    let diffuse_tex = mix(rgb(samples.get(TextureSlot::Diffuse)), rgb(decal), decal.a);
    let ambient_tex = rgb(samples.get(TextureSlot::Ambient));
    let specular_tex =
        rgb(samples.get(TextureSlot::Specular)) * samples.get(TextureSlot::SpecularHighlight).r;

    let ambient = mul(mul(ambient_tex, rgb(light.ambient)), rgb(material.ambient));
    let diffuse = mul(mul(diffuse_tex, rgb(light.diffuse)), rgb(material.diffuse)) * lambert;
    let specular = mul(mul(specular_tex, rgb(light.specular)), rgb(material.specular)) * blinn;
    let lit = ambient + diffuse + specular;

    let alpha = samples.get(TextureSlot::Diffuse).a * material.diffuse.a;
    Some(ShadedFragment {
        color: Color::rgba(lit.x, lit.y, lit.z, alpha),
        normal,
        tangent: orthogonal_tangent(normal, fragment.tangent),
    })
}

fn orthogonal_tangent(n: Vector3<f32>, t: Vector3<f32>) -> Vector3<f32> {
    let projected = t - n * n.dot(t);
    if projected.magnitude2() > 1e-12 {
        return projected.normalize();
    }
    // any perpendicular will do for a missing tangent
    let axis = if n.x.abs() < 0.9 {
        Vector3::unit_x()
    } else {
        Vector3::unit_y()
    };
    normalize_or(axis - n * n.dot(axis), Vector3::unit_x())
}

fn normalize_or(v: Vector3<f32>, fallback: Vector3<f32>) -> Vector3<f32> {
    if v.magnitude2() > 1e-12 && !v.is_zero() {
        v.normalize()
    } else {
        fallback
    }
}

fn rgb(c: Color) -> Vector3<f32> {
    Vector3::new(c.r, c.g, c.b)
}

fn mul(a: Vector3<f32>, b: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(a.x * b.x, a.y * b.y, a.z * b.z)
}

fn mix(a: Vector3<f32>, b: Vector3<f32>, t: f32) -> Vector3<f32> {
    a * (1.0 - t) + b * t
}
