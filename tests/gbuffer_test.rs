use std::panic::{AssertUnwindSafe, catch_unwind};

use lux_ngin::{
    Error,
    framebuffer::{ActiveTarget, Attachment, GBufferSpec, TargetTracker},
    pipelines::composite::shader_source,
};

mod common;

#[test]
fn spec_keeps_requested_size_and_samples() {
    let spec = GBufferSpec::new(800, 600, 4).expect("valid G-buffer");
    assert_eq!((spec.width(), spec.height(), spec.sample_count()), (800, 600, 4));

    for attachment in Attachment::ALL {
        let desc = spec.texture_descriptor(attachment);
        assert_eq!(desc.size.width, 800);
        assert_eq!(desc.size.height, 600);
        assert_eq!(desc.sample_count, 4);
        assert_eq!(desc.format, attachment.format());
        assert!(desc.usage.contains(wgpu::TextureUsages::TEXTURE_BINDING));
    }
    assert_eq!(Attachment::Depth.format(), wgpu::TextureFormat::Depth32Float);
}

#[test]
fn attachments_bind_in_composite_order() {
    let bindings: Vec<u32> = Attachment::ALL.iter().map(|a| a.binding()).collect();
    assert_eq!(bindings, vec![0, 1, 2, 3]);
    assert!(!Attachment::COLOR_TARGETS.contains(&Attachment::Depth));
}

#[test]
fn bad_sizes_and_sample_counts_are_rejected() {
    assert!(matches!(
        GBufferSpec::new(0, 600, 4),
        Err(Error::InvalidTargetSize { width: 0, height: 600 })
    ));
    assert!(matches!(
        GBufferSpec::new(800, 0, 4),
        Err(Error::InvalidTargetSize { .. })
    ));
    for samples in [0, 3, 6, 32] {
        assert!(
            matches!(GBufferSpec::new(800, 600, samples), Err(Error::InvalidSampleCount(n)) if n == samples),
            "{} samples accepted",
            samples
        );
    }
    assert!(GBufferSpec::new(1, 1, 1).is_ok());
}

#[test]
fn unbinding_restores_default_target() {
    let tracker = TargetTracker::new();
    assert_eq!(tracker.active(), ActiveTarget::Default);
    {
        let _bound = tracker.bind(ActiveTarget::GBuffer);
        assert_eq!(tracker.active(), ActiveTarget::GBuffer);
    }
    assert_eq!(tracker.active(), ActiveTarget::Default);
}

#[test]
fn default_target_is_restored_when_the_pass_panics() {
    let tracker = TargetTracker::new();
    let result = catch_unwind(AssertUnwindSafe(|| {
        let _bound = tracker.bind(ActiveTarget::GBuffer);
        panic!("draw failed");
    }));
    assert!(result.is_err());
    assert_eq!(tracker.active(), ActiveTarget::Default);
}

#[test]
fn composite_source_matches_sample_count() {
    let multi = shader_source(4);
    assert!(multi.contains("texture_multisampled_2d<f32>"));
    assert!(multi.contains("texture_depth_multisampled_2d"));
    assert!(!multi.contains("{{"));

    let single = shader_source(1);
    assert!(single.contains("texture_depth_2d"));
    assert!(!single.contains("multisampled"));
}

#[test]
#[cfg(feature = "integration-tests")]
fn gbuffer_passes_run_on_a_real_device() {
    use lux_ngin::{
        context,
        framebuffer::GBuffer,
        math::Color,
        pipelines::{composite::CompositeProgram, geometry::GeometryProgram},
    };

    crate::common::test_utils::init_logger();
    futures::executor::block_on(async {
        let (adapter, device, queue) = context::headless().await.expect("a GPU adapter");
        let spec = GBufferSpec::new(800, 600, 4).expect("valid G-buffer");
        let gbuffer = GBuffer::create(&device, &adapter, spec).expect("supported attachments");
        for attachment in Attachment::ALL {
            let texture = gbuffer.texture(attachment);
            assert_eq!((texture.width(), texture.height()), (800, 600));
            assert_eq!(texture.sample_count(), 4);
        }

        let geometry = GeometryProgram::new(&device, spec).await.expect("geometry shader compiles");
        let composite = CompositeProgram::new(&device, wgpu::TextureFormat::Rgba8UnormSrgb, 4)
            .await
            .expect("composite shader compiles");
        let _inputs = composite.bind_gbuffer(&device, &gbuffer);

        let tracker = TargetTracker::new();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gbuffer test encoder"),
        });
        {
            let mut pass = gbuffer.bind(&mut encoder, &tracker, Color::WHITE);
            assert_eq!(tracker.active(), ActiveTarget::GBuffer);
            pass.set_pipeline(geometry.pipeline());
            pass.unbind();
        }
        assert_eq!(tracker.active(), ActiveTarget::Default);
        queue.submit(std::iter::once(encoder.finish()));
    });
}

#[test]
#[cfg(feature = "integration-tests")]
fn broken_shader_is_reported_with_its_log() {
    use lux_ngin::{context, pipelines::basic::mk_render_pipeline, shader::ShaderProgram};

    futures::executor::block_on(async {
        let (_adapter, device, _queue) = context::headless().await.expect("a GPU adapter");
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });
        let result = ShaderProgram::new(&device, "broken", "fn vs_main( {".to_string(), |shader| {
            mk_render_pipeline(
                &device,
                "broken",
                &layout,
                &[Some(wgpu::TextureFormat::Rgba8Unorm.into())],
                None,
                1,
                None,
                &[],
                shader,
            )
        })
        .await;

        match result {
            Err(Error::ShaderCompilation { label, log }) => {
                assert_eq!(label, "broken");
                assert!(!log.is_empty());
            }
            other => panic!("expected a compilation error, got {:?}", other.map(|p| p.label().to_string())),
        }
    });
}

#[test]
#[cfg(feature = "integration-tests")]
fn model_uploads_follow_the_live_models() {
    use std::sync::Arc;

    use lux_ngin::{
        context,
        data_structures::{
            model::{MaterialDescriptor, MeshDescriptor, ModelCache, ModelDescriptor},
            texture::TextureDescriptor,
        },
        math::Color,
        pipelines::geometry::GeometryProgram,
        resources::primitives,
        shading::TextureSlot,
    };

    crate::common::test_utils::init_logger();
    futures::executor::block_on(async {
        let (_adapter, device, queue) = context::headless().await.expect("a GPU adapter");
        let spec = GBufferSpec::new(64, 64, 1).expect("valid G-buffer");
        let geometry = GeometryProgram::new(&device, spec).await.expect("geometry shader compiles");
        let layout = geometry.material_layout();

        let cube = primitives::cube(1.0, Color::WHITE);
        let red = Arc::new(TextureDescriptor::solid("red", Color::rgb(1.0, 0.0, 0.0)));
        let textured = Arc::new(ModelDescriptor::new(
            "textured cube",
            cube.vertices.clone(),
            vec![MeshDescriptor::new(
                "textured cube",
                cube.meshes[0].indices.clone(),
                MaterialDescriptor::new("red").with_texture(TextureSlot::Diffuse, red),
            )],
        ));

        // nothing was uploaded at finalize, the first frame catches up
        let mut cache = ModelCache::new(&device, &queue);
        cache.sync(&device, &queue, layout, &[cube.clone(), textured.clone(), cube.clone()]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.texture_count(), 1);
        assert!(cache.get(cube.id()).is_some());
        assert!(cache.get(textured.id()).is_some());

        // the textured model's last entity is gone
        cache.sync(&device, &queue, layout, &[cube.clone()]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(textured.id()).is_none());
        assert_eq!(cache.texture_count(), 0);

        cache.sync(&device, &queue, layout, &[]);
        assert!(cache.is_empty());
    });
}
