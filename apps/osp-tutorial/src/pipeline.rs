//! The walkthrough: build the scene, render once, accumulate, save.

use anyhow::{anyhow, Context, Result};
use osprey::{Channels, DataArray, FrameBufferFormat, ImageKind, Library, Size};
use osprey_scene::SceneFile;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

pub struct TutorialOptions {
    pub size: Size,
    pub frames: u32,
    pub renderer: String,
    pub out_dir: PathBuf,
    pub image: ImageKind,
}

#[derive(Debug, Serialize)]
pub struct TutorialOutputs {
    pub first_frame: PathBuf,
    pub accumulated_frame: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct TutorialSummary {
    pub outputs: TutorialOutputs,
    pub accumulated_frames: u32,
    pub first_frame_ms: u128,
    pub accumulation_ms: u128,
    /// Change estimate reported by the last accumulated frame, if finite.
    pub last_variance: Option<f32>,
}

fn extension(kind: ImageKind) -> &'static str {
    match kind {
        ImageKind::Png => "png",
        ImageKind::Ppm => "ppm",
    }
}

pub fn run_tutorial(lib: &Library, scene: &SceneFile, opts: &TutorialOptions) -> Result<TutorialSummary> {
    let size = opts.size;

    let mut camera = lib.new_camera(&scene.camera.kind)?;
    camera.set_aspect(size.aspect())?;
    camera.set_position(scene.camera.position)?;
    camera.set_direction(scene.camera.direction)?;
    camera.set_up(scene.camera.up)?;
    if let Some(fovy) = scene.camera.fovy {
        camera.set_fovy(fovy)?;
    }
    if let Some(height) = scene.camera.height {
        camera.set_height(height)?;
    }
    camera.commit().context("failed to commit camera")?;

    let mut mesh = lib.new_geometry("triangles")?;
    let mut vertex = lib.new_data(&DataArray::float3a(&scene.mesh.vertices))?;
    vertex.commit()?;
    mesh.set_vertices(&vertex)?;
    vertex.release()?;

    if !scene.mesh.colors.is_empty() {
        let mut color = lib.new_data(&DataArray::float4(&scene.mesh.colors))?;
        color.commit()?;
        mesh.set_vertex_colors(&color)?;
        color.release()?;
    }

    let mut index = lib.new_data(&DataArray::int3(&scene.mesh.indices))?;
    index.commit()?;
    mesh.set_indices(&index)?;
    index.release()?;
    mesh.commit().context("failed to commit mesh")?;

    let mut model = lib.new_model()?;
    model.add_geometry(&mesh)?;
    mesh.release()?;
    model.commit().context("failed to commit model")?;

    let mut renderer = lib.new_renderer(&opts.renderer)?;

    let mut lights = Vec::with_capacity(scene.lights.len());
    for spec in &scene.lights {
        let mut light = lib.new_light(&spec.kind)?;
        light.set_color(spec.color)?;
        light.set_intensity(spec.intensity)?;
        if let Some(direction) = spec.direction {
            light.set_direction(direction)?;
        }
        light.commit()?;
        lights.push(light);
    }
    let refs: Vec<_> = lights.iter().collect();
    let mut light_data = lib.new_light_data(&refs)?;
    light_data.commit()?;
    drop(refs);
    for light in lights {
        light.release()?;
    }

    let settings = &scene.renderer;
    renderer.set_ao_samples(settings.ao_samples)?;
    if let Some(distance) = settings.ao_distance {
        renderer.set_ao_distance(distance)?;
    }
    renderer.set_background(settings.background)?;
    renderer.set_spp(settings.spp)?;
    renderer.set_shadows(settings.shadows)?;
    renderer.set_model(&model)?;
    renderer.set_camera(&camera)?;
    renderer.set_lights(&light_data)?;
    renderer.commit().context("failed to commit renderer")?;

    let channels = Channels::COLOR | Channels::ACCUM;
    let mut fb = lib.new_frame_buffer(size, FrameBufferFormat::Srgba, channels)?;
    fb.clear(channels)?;

    std::fs::create_dir_all(&opts.out_dir)
        .map_err(|err| anyhow!("failed to create output directory {:?}: {}", opts.out_dir, err))?;
    let ext = extension(opts.image);
    let first_frame = opts.out_dir.join(format!("firstFrame.{ext}"));
    let accumulated_frame = opts.out_dir.join(format!("accumulatedFrame.{ext}"));

    log::info!("rendering first frame ({size})");
    let started = Instant::now();
    fb.render_frame(&renderer, channels)?;
    let first_frame_ms = started.elapsed().as_millis();
    log::info!("saving {}", first_frame.display());
    fb.save_with(&first_frame, size, FrameBufferFormat::Srgba)
        .with_context(|| format!("failed to save {:?}", first_frame))?;

    let started = Instant::now();
    let mut variance = f32::INFINITY;
    for n in 1..=opts.frames {
        log::info!("accumulating frame #{n}");
        variance = fb.render_frame(&renderer, channels)?;
        log::debug!("frame #{n} variance {variance}");
    }
    let accumulation_ms = started.elapsed().as_millis();
    log::info!("saving {}", accumulated_frame.display());
    fb.save_with(&accumulated_frame, size, FrameBufferFormat::Srgba)
        .with_context(|| format!("failed to save {:?}", accumulated_frame))?;
    let accumulated_frames = fb.accumulated_frames()?;

    fb.release()?;
    renderer.release()?;
    light_data.release()?;
    model.release()?;
    camera.release()?;

    Ok(TutorialSummary {
        outputs: TutorialOutputs {
            first_frame,
            accumulated_frame,
        },
        accumulated_frames,
        first_frame_ms,
        accumulation_ms,
        last_variance: variance.is_finite().then_some(variance),
    })
}
