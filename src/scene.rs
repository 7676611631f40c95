//! The scene catalogue: what each scene generates, how it is framed, and
//! which tweaks its panel exposes.

use std::ops::RangeInclusive;

use crate::{PointCloud, capture::CaptureSettings, generate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum SceneKind {
    Plane,
    Funnel,
    Grid,
    Sphere,
    Mobius,
}

impl SceneKind {
    pub const ALL: [SceneKind; 5] = [
        SceneKind::Plane,
        SceneKind::Funnel,
        SceneKind::Grid,
        SceneKind::Sphere,
        SceneKind::Mobius,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Plane => "Plane",
            SceneKind::Funnel => "Funnel",
            SceneKind::Grid => "Grid",
            SceneKind::Sphere => "Sphere",
            SceneKind::Mobius => "Möbius Strip",
        }
    }

    /// Selector for `animate` in `particles.wgsl`.
    pub fn index(self) -> u32 {
        self as u32
    }

    /// File name the GIF export of this scene is saved under.
    pub fn capture_file_name(self) -> &'static str {
        match self {
            SceneKind::Plane | SceneKind::Funnel => "animation.gif",
            SceneKind::Grid => "animationGrid.gif",
            SceneKind::Sphere => "animationSphere.gif",
            SceneKind::Mobius => "animationStrip.gif",
        }
    }
}

/// Controls shown in a scene's tweak panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tweaks {
    pub progress: bool,
    pub size: bool,
    pub speed: bool,
    pub show_points: bool,
    pub count: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneSettings {
    pub kind: SceneKind,
    /// Lattice side length. The grid scene is `count³` points, the rest `count²`.
    pub count: u32,
    pub count_range: RangeInclusive<u32>,
    pub count_step: u32,
    pub size: f32,
    pub speed: f32,
    pub show_points: bool,
    pub tunnel_length: f32,
    pub camera_position: cgmath::Vector3<f32>,
    /// RGBA in `[0, 1]`.
    pub clear_color: [f32; 4],
    pub capture: CaptureSettings,
    pub tweaks: Tweaks,
}

/// `#181818`
const DARK_GREY: [f32; 4] = [0.094, 0.094, 0.094, 1.0];
const TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

impl SceneSettings {
    pub fn new(kind: SceneKind) -> Self {
        let base = Self {
            kind,
            count: 0,
            count_range: 0..=0,
            count_step: 1,
            size: 0.5,
            speed: 0.5,
            show_points: false,
            tunnel_length: generate::FUNNEL_LENGTH,
            camera_position: cgmath::vec3(0.0, -0.5, -0.1),
            clear_color: DARK_GREY,
            capture: CaptureSettings::new(2.0, 50),
            tweaks: Tweaks::default(),
        };

        match kind {
            SceneKind::Plane => Self {
                count: 512,
                count_range: 64..=1024,
                count_step: 64,
                ..base
            },
            SceneKind::Funnel => Self {
                count: 128,
                count_range: 32..=512,
                count_step: 8,
                camera_position: cgmath::vec3(0.0, 0.0, -0.1),
                ..base
            },
            SceneKind::Grid => Self {
                count: 24,
                count_range: 4..=64,
                count_step: 2,
                camera_position: cgmath::vec3(0.0, 0.0, -0.1),
                clear_color: TRANSPARENT,
                capture: CaptureSettings::new(10.0, 20),
                tweaks: Tweaks {
                    progress: true,
                    size: true,
                    speed: true,
                    show_points: true,
                    count: false,
                },
                ..base
            },
            SceneKind::Sphere => Self {
                count: 128,
                count_range: 32..=512,
                count_step: 8,
                clear_color: TRANSPARENT,
                capture: CaptureSettings::new(5.0, 20),
                tweaks: Tweaks {
                    progress: true,
                    size: true,
                    count: true,
                    ..Tweaks::default()
                },
                ..base
            },
            SceneKind::Mobius => Self {
                count: 64,
                count_range: 16..=256,
                count_step: 8,
                capture: CaptureSettings::new(10.0, 20),
                tweaks: Tweaks {
                    progress: true,
                    ..Tweaks::default()
                },
                ..base
            },
        }
    }

    /// Clamps `count` into range and snaps it down onto the step grid.
    /// Returns whether the stored count changed.
    pub fn set_count(&mut self, count: u32) -> bool {
        let (lo, hi) = (*self.count_range.start(), *self.count_range.end());
        let clamped = count.clamp(lo, hi);
        let snapped = (lo + (clamped - lo) / self.count_step.max(1) * self.count_step).max(lo);
        let changed = snapped != self.count;
        self.count = snapped;
        changed
    }

    pub fn particle_count(&self) -> usize {
        let n = self.count as usize;
        match self.kind {
            SceneKind::Grid => n * n * n,
            _ => n * n,
        }
    }

    pub fn generate(&self, seed: u64) -> PointCloud {
        generate::generate(self.kind, self.count, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_each_scene() {
        let sphere = SceneSettings::new(SceneKind::Sphere);
        assert_eq!(sphere.count, 128);
        assert_eq!(sphere.count_range, 32..=512);
        assert_eq!(sphere.capture.frame_count(), 100);
        assert!(sphere.tweaks.count && !sphere.tweaks.speed);

        let grid = SceneSettings::new(SceneKind::Grid);
        assert_eq!(grid.particle_count(), 24 * 24 * 24);
        assert_eq!(grid.clear_color[3], 0.0);
        assert_eq!(grid.capture.frame_count(), 200);

        let plane = SceneSettings::new(SceneKind::Plane);
        assert_eq!(plane.particle_count(), 512 * 512);
        assert_eq!(plane.tweaks, Tweaks::default());
    }

    #[test]
    fn set_count_clamps_and_snaps() {
        let mut sphere = SceneSettings::new(SceneKind::Sphere);
        assert!(sphere.set_count(1000));
        assert_eq!(sphere.count, 512);
        assert!(sphere.set_count(3));
        assert_eq!(sphere.count, 32);
        assert!(sphere.set_count(77));
        assert_eq!(sphere.count, 72);
        assert!(!sphere.set_count(79));
    }

    #[test]
    fn every_scene_generates_its_particle_count() {
        for kind in SceneKind::ALL {
            let mut settings = SceneSettings::new(kind);
            settings.set_count(*settings.count_range.start());
            let cloud = settings.generate(9);
            assert_eq!(cloud.kind, kind);
            assert_eq!(cloud.len(), settings.particle_count());
        }
    }

    #[test]
    fn shader_indices_are_distinct() {
        let mut indices: Vec<_> = SceneKind::ALL.iter().map(|k| k.index()).collect();
        indices.dedup();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }
}
