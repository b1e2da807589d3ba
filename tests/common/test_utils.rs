use cgmath::{InnerSpace, Rad, Vector3, Vector4};
use lux_ngin::{
    camera::{Camera, Projection},
    math::Vec3,
    ssao::{GBufferImage, SsaoView},
};

pub(crate) const NEAR: f32 = 0.1;
pub(crate) const FAR: f32 = 100.0;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {} to be within {} of {}",
        actual,
        tolerance,
        expected
    );
}

pub(crate) fn assert_close_f32(actual: f32, expected: f32, tolerance: f32) {
    assert_close(actual as f64, expected as f64, tolerance as f64);
}

pub(crate) fn assert_vec3_close(actual: Vec3, expected: Vec3, tolerance: f64) {
    assert!(
        (actual - expected).magnitude() <= tolerance,
        "expected {:?} to be within {} of {:?}",
        actual,
        tolerance,
        expected
    );
}

pub(crate) fn assert_vec3_close_f32(actual: Vector3<f32>, expected: Vector3<f32>, tolerance: f32) {
    assert!(
        (actual - expected).magnitude() <= tolerance,
        "expected {:?} to be within {} of {:?}",
        actual,
        tolerance,
        expected
    );
}

/// A camera at the origin looking down -z and a square projection.
pub(crate) fn origin_view(size: u32) -> (Camera, Projection) {
    let camera = Camera::new((0.0, 0.0, 0.0), Rad(0.0), Rad(0.0), Rad(0.0));
    let projection = Projection::new(size, size, Rad(std::f32::consts::FRAC_PI_3), NEAR, FAR);
    (camera, projection)
}

/// Depth buffer value of a point `distance` in front of the camera.
pub(crate) fn depth_at(projection: &Projection, distance: f32) -> f32 {
    let clip = projection.calc_matrix() * Vector4::new(0.0, 0.0, -distance, 1.0);
    clip.z / clip.w
}

/// A G-buffer filled by a plane facing the camera at `distance`.
pub(crate) fn facing_plane(size: u32, samples: u32, distance: f32) -> (GBufferImage, SsaoView) {
    let (camera, projection) = origin_view(size);
    let depth = depth_at(&projection, distance);
    let mut image = GBufferImage::new(size, size, samples);
    for y in 0..size {
        for x in 0..size {
            image.set_texel(x, y, depth, Vector3::unit_z(), Vector3::unit_x());
        }
    }
    (image, SsaoView::new(&camera, &projection))
}
