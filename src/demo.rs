//! Synthetic payload for running the viewer without data files.
//!
//! A squashed UV sphere stands in for a cortical hemisphere. Regions are
//! longitude sectors, the polar caps carry the "unknown" label, colors are a
//! wave travelling around the sphere, and the traces are phase-shifted
//! sinusoids.

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};

use crate::error::Result;
use crate::payload::{AtlasColors, ColorFrames, Payload, SurfaceMesh, Traces, Transform};

/// Label for vertices outside every region.
pub const UNKNOWN_LABEL: i32 = -1;

const REGION_NAMES: [&str; 8] = [
    "L_G_front_sup",
    "L_G_front_middle",
    "L_G_precentral",
    "L_G_postcentral",
    "L_G_pariet_inf",
    "L_G_occipital_sup",
    "L_G_temporal_middle",
    "L_G_insular_short",
];

/// Latitude above which vertices belong to the polar caps.
const CAP_LATITUDE: f32 = 0.42 * PI;

const TRACE_CHANNELS: usize = 8;

/// Hemisphere half-extents.
const SHAPE: Vec3 = Vec3::new(0.7, 0.85, 1.0);

/// Millimetres per mesh unit, roughly a real hemisphere.
const SCALE_MM: f32 = 70.0;

#[derive(Clone, Debug, PartialEq)]
pub struct DemoSettings {
    pub vertices_per_ring: usize,
    pub rings: usize,
    pub frames: usize,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            vertices_per_ring: 64,
            rings: 48,
            frames: 120,
        }
    }
}

/// Build the demo payload.
pub fn hemisphere(settings: &DemoSettings) -> Result<Payload> {
    let per_ring = settings.vertices_per_ring.max(3);
    let rings = settings.rings.max(2);
    let frames = settings.frames.max(1);

    let mut vertices = Vec::with_capacity(per_ring * (rings - 1) + 2);
    let mut longitudes = Vec::with_capacity(vertices.capacity());
    let mut labels = Vec::with_capacity(vertices.capacity());

    vertices.push(Vec3::Y * SHAPE);
    longitudes.push(0.0);
    labels.push(UNKNOWN_LABEL);
    for ring in 1..rings {
        let latitude = PI * 0.5 - PI * ring as f32 / rings as f32;
        for j in 0..per_ring {
            let longitude = TAU * j as f32 / per_ring as f32;
            let dir = Vec3::new(
                latitude.cos() * longitude.sin(),
                latitude.sin(),
                latitude.cos() * longitude.cos(),
            );
            vertices.push(dir * SHAPE);
            longitudes.push(longitude);
            labels.push(if latitude.abs() > CAP_LATITUDE {
                UNKNOWN_LABEL
            } else {
                (j * REGION_NAMES.len() / per_ring) as i32
            });
        }
    }
    vertices.push(Vec3::NEG_Y * SHAPE);
    longitudes.push(0.0);
    labels.push(UNKNOWN_LABEL);

    let faces = sphere_faces(per_ring, rings);
    let vertex_count = vertices.len();
    let heights: Vec<f32> = vertices.iter().map(|v| v.y / SHAPE.y).collect();

    // Left hemisphere: offset from the midline, tilted slightly forward.
    let mesh = SurfaceMesh::new(
        vertices,
        faces,
        labels.clone(),
        REGION_NAMES.iter().map(|s| s.to_string()).collect(),
    )?
    .with_transform(
        Transform::new()
            .position(Vec3::new(-0.5 * SCALE_MM, 0.0, 0.0))
            .rotation(Quat::from_rotation_x(0.15))
            .uniform_scale(SCALE_MM),
    );

    let mut color_data = Vec::with_capacity(vertex_count * frames * 3);
    for (&longitude, &height) in longitudes.iter().zip(&heights) {
        for frame in 0..frames {
            let phase = TAU * frame as f32 / frames as f32;
            let w = 0.5 + 0.5 * (2.0 * longitude + 3.0 * height - phase).sin();
            color_data.extend_from_slice(&heat(w));
        }
    }
    let color_frames = ColorFrames::new(color_data, vertex_count, frames, 3)?;

    let atlas_data: Vec<f32> = labels.iter().flat_map(|&l| region_color(l)).collect();
    let atlas = AtlasColors::new(atlas_data, vertex_count, 3)?;

    let traces = Traces::new(
        (0..TRACE_CHANNELS)
            .map(|c| {
                let freq = 1.0 + c as f32 * 0.5;
                let amp = 1.0 / (1.0 + c as f32 * 0.3);
                (0..frames)
                    .map(|i| {
                        let t = i as f32 / frames as f32;
                        amp * (TAU * freq * t + c as f32).sin()
                    })
                    .collect()
            })
            .collect(),
    )?;

    Ok(Payload::new(mesh)
        .with_color_frames(color_frames)
        .with_atlas_colors(atlas)
        .with_traces(traces))
}

/// Triangles for a UV sphere with a single vertex at each pole.
fn sphere_faces(per_ring: usize, rings: usize) -> Vec<[u32; 3]> {
    let ring_start = |ring: usize| 1 + (ring - 1) * per_ring;
    let south = (1 + (rings - 1) * per_ring) as u32;
    let mut faces = Vec::with_capacity(2 * per_ring * (rings - 1));

    for j in 0..per_ring {
        let next = (j + 1) % per_ring;
        faces.push([0, (ring_start(1) + j) as u32, (ring_start(1) + next) as u32]);
    }
    for ring in 1..rings - 1 {
        let (a, b) = (ring_start(ring), ring_start(ring + 1));
        for j in 0..per_ring {
            let next = (j + 1) % per_ring;
            let (a0, a1) = ((a + j) as u32, (a + next) as u32);
            let (b0, b1) = ((b + j) as u32, (b + next) as u32);
            faces.push([a0, b0, a1]);
            faces.push([a1, b0, b1]);
        }
    }
    let last = ring_start(rings - 1);
    for j in 0..per_ring {
        let next = (j + 1) % per_ring;
        faces.push([south, (last + next) as u32, (last + j) as u32]);
    }
    faces
}

/// Blue to red through pale yellow.
fn heat(w: f32) -> [f32; 3] {
    let w = w.clamp(0.0, 1.0);
    let mid = 1.0 - (2.0 * w - 1.0).abs();
    [w, 0.25 + 0.6 * mid, 1.0 - w]
}

fn region_color(label: i32) -> [f32; 3] {
    if label < 0 {
        return [0.5, 0.5, 0.5];
    }
    let hue = label as f32 / REGION_NAMES.len() as f32;
    [
        0.5 + 0.4 * (TAU * hue).cos(),
        0.5 + 0.4 * (TAU * (hue - 1.0 / 3.0)).cos(),
        0.5 + 0.4 * (TAU * (hue - 2.0 / 3.0)).cos(),
    ]
}
