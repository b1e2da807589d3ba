//! Engine configuration.
//!
//! Everything here is set in code before [`crate::engine::Engine::run`];
//! there is no file or command-line layer.

use cgmath::Vector3;

use crate::math::Color;

/// Screen-space ambient occlusion tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsaoConfig {
    /// Kernel samples per pixel and multi-sample, capped at [`SsaoConfig::MAX_KERNEL_SIZE`].
    pub kernel_size: u32,
    /// World-space radius of the sampling hemisphere.
    pub radius: f32,
    /// Occluders further in front of a sample than this are ignored.
    pub depth_tolerance: f32,
    /// Minimum depth difference that counts as occlusion.
    pub bias: f32,
    /// The darkening applied in the composite is clamped to `[min, max]`.
    pub occlusion_range: [f32; 2],
}

impl SsaoConfig {
    pub const MAX_KERNEL_SIZE: u32 = 64;

    pub fn kernel_size(&self) -> u32 {
        self.kernel_size.clamp(1, Self::MAX_KERNEL_SIZE)
    }
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            kernel_size: 16,
            radius: 0.5,
            depth_tolerance: 2.0,
            bias: 0.025,
            occlusion_range: [0.25, 0.5],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub position: Vector3<f32>,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 1000.0, 0.0),
            ambient: Color::WHITE,
            diffuse: Color::GRAY,
            specular: Color::GRAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Physics steps per second.
    pub update_rate: u32,
    /// Frames per second the loop paces itself to.
    pub render_rate: u32,
    /// Multi-sample count of every G-buffer attachment.
    pub sample_count: u32,
    pub geometry_clear: Color,
    pub composite_clear: Color,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub light: LightConfig,
    pub ssao: SsaoConfig,
    /// Show color, normal, tangent and depth in four screen quadrants.
    pub debug_gbuffer: bool,
}

impl EngineConfig {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_rates(mut self, update_rate: u32, render_rate: u32) -> Self {
        self.update_rate = update_rate.max(1);
        self.render_rate = render_rate.max(1);
        self
    }

    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_clip_planes(mut self, znear: f32, zfar: f32) -> Self {
        self.znear = znear;
        self.zfar = zfar;
        self
    }

    pub fn with_light(mut self, light: LightConfig) -> Self {
        self.light = light;
        self
    }

    pub fn with_ssao(mut self, ssao: SsaoConfig) -> Self {
        self.ssao = ssao;
        self
    }

    pub fn with_debug_gbuffer(mut self, enabled: bool) -> Self {
        self.debug_gbuffer = enabled;
        self
    }

    pub fn update_period(&self) -> instant::Duration {
        instant::Duration::from_secs_f64(1.0 / self.update_rate.max(1) as f64)
    }

    pub fn render_period(&self) -> instant::Duration {
        instant::Duration::from_secs_f64(1.0 / self.render_rate.max(1) as f64)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Lux".to_string(),
            width: 1024,
            height: 768,
            update_rate: 60,
            render_rate: 60,
            sample_count: 4,
            geometry_clear: Color::CORNFLOWER_BLUE,
            composite_clear: Color::BLUE_VIOLET,
            fovy: std::f32::consts::FRAC_PI_3,
            znear: 0.1,
            zfar: 10000.0,
            light: LightConfig::default(),
            ssao: SsaoConfig::default(),
            debug_gbuffer: false,
        }
    }
}
