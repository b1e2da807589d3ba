use cgmath::{Matrix4, SquareMatrix};
use lux_ngin::{
    math::Color,
    pipelines::{
        composite::composite_uniforms,
        geometry::{frame_uniforms, material_uniforms},
    },
    shader::{UniformBlock, UniformType},
};

use crate::common::test_utils::init_logger;

mod common;

fn floats(bytes: &[u8]) -> Vec<f32> {
    bytes.chunks_exact(4).map(bytemuck::pod_read_unaligned::<f32>).collect()
}

fn offset(block: &UniformBlock, name: &str) -> usize {
    block.slot(name).map(|s| s.offset).unwrap_or_else(|| panic!("no field {}", name))
}

#[test]
fn frame_block_follows_wgsl_layout() {
    let block = frame_uniforms();
    let expected = [
        ("mat_view", 0),
        ("mat_proj", 64),
        ("light_pos", 128),
        ("eye_pos", 144),
        ("light_ambient", 160),
        ("light_diffuse", 176),
        ("light_specular", 192),
    ];
    for (name, at) in expected {
        assert_eq!(offset(&block, name), at, "{}", name);
    }
    assert_eq!(block.size(), 208);
}

#[test]
fn material_block_follows_wgsl_layout() {
    let block = material_uniforms();
    assert_eq!(offset(&block, "mat_ambient"), 0);
    assert_eq!(offset(&block, "mat_diffuse"), 16);
    assert_eq!(offset(&block, "mat_specular"), 32);
    assert_eq!(offset(&block, "mat_shininess"), 48);
    assert_eq!(offset(&block, "bound_mask"), 52);
    assert_eq!(block.size(), 64);
}

#[test]
fn composite_block_follows_wgsl_layout() {
    let block = composite_uniforms();
    assert_eq!(offset(&block, "mat_inv_proj"), 0);
    assert_eq!(offset(&block, "mat_inv_view"), 64);
    assert_eq!(offset(&block, "mat_view_proj"), 128);
    assert_eq!(offset(&block, "near"), 192);
    assert_eq!(offset(&block, "far"), 196);
    assert_eq!(offset(&block, "occlusion_max"), 216);
    assert_eq!(offset(&block, "sample_count"), 220);
    assert_eq!(offset(&block, "debug_view"), 228);
    assert_eq!(block.size(), 240);
}

#[test]
fn vec3_is_padded_to_sixteen_bytes() {
    let block = UniformBlock::new(
        "padding",
        &[
            ("a", UniformType::F32),
            ("b", UniformType::Vec3),
            ("c", UniformType::F32),
            ("d", UniformType::Vec2),
        ],
    );
    assert_eq!(offset(&block, "a"), 0);
    assert_eq!(offset(&block, "b"), 16);
    // a scalar may sit in the tail of a vec3
    assert_eq!(offset(&block, "c"), 28);
    assert_eq!(offset(&block, "d"), 32);
    assert_eq!(block.size(), 48);
}

#[test]
fn writes_land_at_their_slot() {
    let mut block = material_uniforms();
    block.set_color("mat_diffuse", Color::rgba(0.25, 0.5, 0.75, 1.0));
    block.set_f32("mat_shininess", 32.0);
    block.set_u32("bound_mask", 0b101);

    let bytes = block.bytes();
    assert_eq!(floats(&bytes[16..32]), vec![0.25, 0.5, 0.75, 1.0]);
    assert_eq!(bytemuck::pod_read_unaligned::<f32>(&bytes[48..52]), 32.0);
    assert_eq!(bytemuck::pod_read_unaligned::<u32>(&bytes[52..56]), 0b101);

    let mut frame = frame_uniforms();
    frame.set_mat4("mat_proj", Matrix4::from_scale(2.0));
    let proj = floats(&frame.bytes()[64..128]);
    assert_eq!(proj[0], 2.0);
    assert_eq!(proj[15], 1.0);
    frame.set_mat4("mat_view", Matrix4::identity());
    let view = floats(&frame.bytes()[0..64]);
    assert_eq!(view[5], 1.0);
}

#[test]
fn unknown_names_and_wrong_types_are_ignored() {
    init_logger();
    let mut block = material_uniforms();
    let before = block.bytes().to_vec();
    block.set_f32("mat_glossiness", 1.0);
    block.set_vec3("mat_shininess", [1.0, 2.0, 3.0]);
    block.set_f32("bound_mask", 3.0);
    assert_eq!(block.bytes(), before.as_slice());
}

#[test]
fn fresh_blocks_are_dirty() {
    let block = frame_uniforms();
    assert!(block.is_dirty());
    assert_eq!(block.label(), "frame uniforms");
}
