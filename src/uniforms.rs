//! Per-frame values that drive the vertex-shader animation.

use encase::ShaderType;

use crate::{SceneKind, SceneSettings};

/// Upper bound on the device pixel ratio used for the resolution uniform.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneUniforms {
    pub scene: SceneKind,
    /// Seconds since the scene started.
    pub time: f32,
    progress: f32,
    pub size: f32,
    pub speed: f32,
    pub show_points: bool,
    pub tunnel_length: f32,
    resolution: cgmath::Vector2<f32>,
}

/// Matches `Uniforms` in `particles.wgsl`.
#[derive(ShaderType)]
pub struct GpuUniforms {
    pub resolution: cgmath::Vector2<f32>,
    pub time: f32,
    pub progress: f32,
    pub size: f32,
    pub speed: f32,
    pub tunnel_length: f32,
    pub show_points: u32,
    pub scene: u32,
}

impl SceneUniforms {
    pub fn new(settings: &SceneSettings) -> Self {
        Self {
            scene: settings.kind,
            time: 0.0,
            progress: 0.0,
            size: settings.size,
            speed: settings.speed,
            show_points: settings.show_points,
            tunnel_length: settings.tunnel_length,
            resolution: cgmath::vec2(1.0, 1.0),
        }
    }

    pub fn advance(&mut self, elapsed: f32) {
        self.time = elapsed;
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
    }

    pub fn resolution(&self) -> cgmath::Vector2<f32> {
        self.resolution
    }

    /// `size` is in logical points. The pixel ratio is capped at
    /// [`MAX_PIXEL_RATIO`] and each axis is kept at least one pixel.
    pub fn set_resolution(&mut self, size: cgmath::Vector2<f32>, pixels_per_point: f32) {
        let ratio = pixels_per_point.clamp(f32::MIN_POSITIVE, MAX_PIXEL_RATIO);
        self.resolution = cgmath::vec2((size.x * ratio).max(1.0), (size.y * ratio).max(1.0));
    }

    pub fn to_gpu(&self) -> GpuUniforms {
        GpuUniforms {
            resolution: self.resolution,
            time: self.time,
            progress: self.progress.clamp(0.0, 1.0),
            size: self.size,
            speed: self.speed,
            tunnel_length: self.tunnel_length,
            show_points: self.show_points as u32,
            scene: self.scene.index(),
        }
    }
}
