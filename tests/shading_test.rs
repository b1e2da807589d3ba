use std::f32::consts::{FRAC_1_SQRT_2, PI};

use cgmath::{InnerSpace, Vector3};
use lux_ngin::{
    config::LightConfig,
    math::Color,
    shading::{Fragment, MaterialParams, SlotSamples, TextureSlot, is_cut_out, perturb_normal, shade},
};

use crate::common::test_utils::{assert_close_f32, assert_vec3_close_f32};

mod common;

fn light_at(position: Vector3<f32>) -> LightConfig {
    LightConfig {
        position,
        ambient: Color::rgb(0.1, 0.1, 0.1),
        diffuse: Color::rgb(0.5, 0.5, 0.5),
        specular: Color::rgb(0.5, 0.5, 0.5),
    }
}

fn fragment(samples: SlotSamples) -> Fragment {
    Fragment {
        position: Vector3::new(0.0, 0.0, 0.0),
        normal: Vector3::unit_y(),
        tangent: Vector3::unit_x(),
        samples,
    }
}

const EYE: Vector3<f32> = Vector3::new(0.0, 10.0, 0.0);

#[test]
fn unbound_slots_have_neutral_values() {
    let samples = SlotSamples::default();
    for slot in TextureSlot::ALL {
        assert!(!samples.is_bound(slot));
        assert_eq!(samples.get(slot), slot.neutral());
    }
    assert_eq!(TextureSlot::Specular.neutral(), Color::GRAY);
    assert_eq!(TextureSlot::Diffuse.neutral(), Color::WHITE);
    assert_eq!(TextureSlot::Bump.neutral().a, 0.0);
    assert_eq!(TextureSlot::StencilDecal.neutral().a, 0.0);
}

#[test]
fn slots_follow_the_uniform_naming_convention() {
    let names: Vec<&str> = TextureSlot::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec![
            "tex_ambient",
            "tex_diffuse",
            "tex_alpha",
            "tex_bump",
            "tex_specular_highlight",
            "tex_specular",
            "tex_stencil_decal",
        ]
    );
    let mask = TextureSlot::ALL.iter().fold(0, |m, s| m | s.mask_bit());
    assert_eq!(mask, 0b111_1111);
    assert_eq!(TextureSlot::Bump.mask_bit(), 8);
}

#[test]
fn head_on_light_gives_full_diffuse_and_specular() {
    let shaded = shade(
        &fragment(SlotSamples::default()),
        &MaterialParams::default(),
        &light_at(Vector3::new(0.0, 10.0, 0.0)),
        EYE,
    )
    .expect("nothing cuts this fragment out");

    // ambient + diffuse + gray specular map
    assert_close_f32(shaded.color.r, 0.1 + 0.5 + 0.5 * 0.5, 1e-5);
    assert_close_f32(shaded.color.a, 1.0, 0.0);
    assert_vec3_close_f32(shaded.normal, Vector3::unit_y(), 1e-6);
    assert_close_f32(shaded.tangent.dot(shaded.normal), 0.0, 1e-6);
}

#[test]
fn oblique_light_uses_lambert_and_blinn_terms() {
    let shaded = shade(
        &fragment(SlotSamples::default()),
        &MaterialParams::default(),
        &light_at(Vector3::new(10.0, 10.0, 0.0)),
        EYE,
    )
    .expect("nothing cuts this fragment out");

    // the half vector sits 22.5 degrees off the normal
    let blinn = (PI / 8.0).cos().powi(10);
    let expected = 0.1 + 0.5 * FRAC_1_SQRT_2 + 0.25 * blinn;
    assert_close_f32(shaded.color.g, expected, 1e-4);
}

#[test]
fn light_behind_surface_still_adds_specular() {
    let light_position = Vector3::new(10.0, -1.0, 0.0);
    let shaded = shade(
        &fragment(SlotSamples::default()),
        &MaterialParams::default(),
        &light_at(light_position),
        EYE,
    )
    .expect("nothing cuts this fragment out");

    // no diffuse, but the half vector still leans towards the normal
    let half = (light_position.normalize() + EYE.normalize()).normalize();
    let blinn = half.y.powi(10);
    assert!(blinn > 0.01);
    assert_close_f32(shaded.color.b, 0.1 + 0.25 * blinn, 1e-5);
}

#[test]
fn alpha_map_cuts_out_opaque_dark_texels() {
    assert!(is_cut_out(Color::rgba(0.2, 0.2, 0.2, 1.0)));
    assert!(!is_cut_out(Color::rgba(0.2, 0.2, 0.2, 0.5)));
    assert!(!is_cut_out(Color::rgba(0.6, 0.0, 0.0, 1.0)));
    assert!(!is_cut_out(TextureSlot::Alpha.neutral()));

    let light = light_at(Vector3::new(0.0, 10.0, 0.0));
    let material = MaterialParams::default();
    let cut = SlotSamples::default().with(TextureSlot::Alpha, Color::BLACK);
    assert!(shade(&fragment(cut), &material, &light, EYE).is_none());
    let kept = SlotSamples::default().with(TextureSlot::Alpha, Color::rgba(0.0, 0.0, 0.0, 0.99));
    assert!(shade(&fragment(kept), &material, &light, EYE).is_some());
}

#[test]
fn bump_only_applies_when_bound_with_alpha() {
    let n = Vector3::unit_y();
    let t = Vector3::unit_x();
    let sideways = Color::rgba(1.0, 0.5, 0.5, 1.0);

    assert_vec3_close_f32(perturb_normal(n, t, sideways, false), n, 1e-6);
    assert_vec3_close_f32(
        perturb_normal(n, t, Color::rgba(1.0, 0.5, 0.5, 0.0), true),
        n,
        1e-6,
    );
    assert_vec3_close_f32(perturb_normal(n, t, sideways, true), t, 1e-5);
    // a flat normal map texel keeps the normal
    assert_vec3_close_f32(
        perturb_normal(n, t, Color::rgba(0.5, 0.5, 1.0, 1.0), true),
        n,
        1e-5,
    );
}

#[test]
fn bound_bump_changes_lighting() {
    let light = light_at(Vector3::new(0.0, 10.0, 0.0));
    let material = MaterialParams::default();
    let flat = shade(&fragment(SlotSamples::default()), &material, &light, EYE)
        .expect("nothing cuts this fragment out");
    let bumped_samples = SlotSamples::default().with(TextureSlot::Bump, Color::rgba(1.0, 0.5, 0.5, 1.0));
    let bumped = shade(&fragment(bumped_samples), &material, &light, EYE)
        .expect("nothing cuts this fragment out");

    assert_vec3_close_f32(bumped.normal, Vector3::unit_x(), 1e-5);
    assert!(bumped.color.r < flat.color.r);
}

#[test]
fn decal_blends_over_diffuse_by_its_alpha() {
    let light = LightConfig {
        position: Vector3::new(0.0, 10.0, 0.0),
        ambient: Color::BLACK,
        diffuse: Color::WHITE,
        specular: Color::BLACK,
    };
    let samples = SlotSamples::default()
        .with(TextureSlot::Diffuse, Color::rgb(1.0, 0.0, 0.0))
        .with(TextureSlot::StencilDecal, Color::rgba(0.0, 0.0, 1.0, 0.5));
    let shaded = shade(&fragment(samples), &MaterialParams::default(), &light, EYE)
        .expect("nothing cuts this fragment out");

    assert_close_f32(shaded.color.r, 0.5, 1e-6);
    assert_close_f32(shaded.color.g, 0.0, 1e-6);
    assert_close_f32(shaded.color.b, 0.5, 1e-6);
}

#[test]
fn alpha_comes_from_diffuse_texture_and_material() {
    let material = MaterialParams {
        diffuse: Color::rgba(1.0, 1.0, 1.0, 0.5),
        ..MaterialParams::default()
    };
    let samples = SlotSamples::default().with(TextureSlot::Diffuse, Color::rgba(1.0, 1.0, 1.0, 0.5));
    let shaded = shade(
        &fragment(samples),
        &material,
        &light_at(Vector3::new(0.0, 10.0, 0.0)),
        EYE,
    )
    .expect("nothing cuts this fragment out");
    assert_close_f32(shaded.color.a, 0.25, 1e-6);
}

#[test]
fn missing_specular_map_still_gives_highlights() {
    let light = LightConfig {
        position: Vector3::new(0.0, 10.0, 0.0),
        ambient: Color::BLACK,
        diffuse: Color::BLACK,
        specular: Color::WHITE,
    };
    let shaded = shade(
        &fragment(SlotSamples::default()),
        &MaterialParams::default(),
        &light,
        EYE,
    )
    .expect("nothing cuts this fragment out");
    assert_close_f32(shaded.color.r, 0.5, 1e-6);
}
