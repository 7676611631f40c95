//! Procedural particle scenes rendered as GPU point clouds.
//!
//! Every scene is a [`PointCloud`] produced once by one of the generators in
//! [`generate`], then animated entirely on the GPU from a handful of
//! per-frame values held in [`uniforms::SceneUniforms`].

pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod generate;
pub mod scene;
pub mod uniforms;

use encase::{ArrayLength, ShaderType};

pub use error::{Error, Result};
pub use scene::{SceneKind, SceneSettings};

/// A single point as it is laid out in the particle storage buffer.
#[derive(Clone, Copy, Debug, PartialEq, ShaderType)]
pub struct Particle {
    pub position: cgmath::Vector3<f32>,
    /// Random phase in `[0, 1)`.
    pub offset: f32,
    pub speed_factor: f32,
    pub size_factor: f32,
    /// Parametric coordinates the point was sampled at.
    pub param: cgmath::Vector2<f32>,
}

/// Storage buffer view over a cloud, matching `Particles` in `particles.wgsl`.
#[derive(ShaderType)]
pub struct GpuParticles<'a> {
    pub length: ArrayLength,
    #[size(runtime)]
    pub particles: &'a [Particle],
}

/// The generated particles of one scene.
#[derive(Clone, Debug)]
pub struct PointCloud {
    pub kind: SceneKind,
    /// Lattice side length the cloud was generated from.
    pub count: u32,
    pub particles: Vec<Particle>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Serializes the cloud into the storage buffer layout.
    pub fn to_storage_bytes(&self) -> Result<Vec<u8>> {
        let mut storage = encase::StorageBuffer::new(Vec::new());
        storage.write(&GpuParticles {
            length: ArrayLength,
            particles: &self.particles,
        })?;
        Ok(storage.into_inner())
    }
}
