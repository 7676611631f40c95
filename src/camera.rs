//! Damped orbit camera around the origin.

use cgmath::prelude::*;
use encase::ShaderType;

pub const FOV_DEGREES: f32 = 35.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

const MIN_DISTANCE: f32 = 0.01;
const MAX_DISTANCE: f32 = FAR * 0.5;
const MAX_PITCH: f32 = 89.9999;
/// Fraction of the pending motion applied per 60 Hz frame.
const DAMPING: f32 = 0.05;

/// cgmath projects depth into `[-1, 1]`, wgpu clips to `[0, 1]`.
#[rustfmt::skip]
fn opengl_to_wgpu() -> cgmath::Matrix4<f32> {
    cgmath::Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.0,
        0.0, 0.0, 0.5, 1.0,
    )
}

#[derive(ShaderType)]
pub struct GpuCamera {
    pub view_matrix: cgmath::Matrix4<f32>,
    pub projection_matrix: cgmath::Matrix4<f32>,
}

pub struct Axes {
    pub forward: cgmath::Vector3<f32>,
    pub right: cgmath::Vector3<f32>,
    pub up: cgmath::Vector3<f32>,
}

#[derive(Clone, Debug)]
pub struct Camera {
    pub target: cgmath::Vector3<f32>,
    pub up: cgmath::Vector3<f32>,
    /// Degrees.
    pub pitch: f32,
    /// Degrees.
    pub yaw: f32,
    pub distance: f32,
    pending_yaw: f32,
    pending_pitch: f32,
    /// Multiplicative zoom still to be applied.
    pending_zoom: f32,
}

impl Camera {
    /// Camera at `position`, looking at the origin.
    pub fn new(position: cgmath::Vector3<f32>) -> Self {
        let distance = position.magnitude().max(MIN_DISTANCE);
        let dir = -position / distance;
        Self {
            target: cgmath::vec3(0.0, 0.0, 0.0),
            up: cgmath::vec3(0.0, 1.0, 0.0),
            pitch: dir.y.clamp(-1.0, 1.0).asin().to_degrees().clamp(-MAX_PITCH, MAX_PITCH),
            yaw: dir.x.atan2(-dir.z).to_degrees(),
            distance,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
            pending_zoom: 1.0,
        }
    }

    pub fn calculate_axes(&self) -> Axes {
        let yaw_rad = self.yaw.to_radians();
        let pitch_rad = self.pitch.to_radians();

        let forward = cgmath::vec3(
            pitch_rad.cos() * yaw_rad.sin(),
            pitch_rad.sin(),
            -pitch_rad.cos() * yaw_rad.cos(),
        )
        .normalize();

        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        Axes { forward, right, up }
    }

    pub fn position(&self) -> cgmath::Vector3<f32> {
        self.target - self.calculate_axes().forward * self.distance
    }

    /// Queues a rotation in degrees, eased in over the following updates.
    pub fn rotate(&mut self, yaw: f32, pitch: f32) {
        self.pending_yaw += yaw;
        self.pending_pitch += pitch;
    }

    /// Queues a zoom; factors below one move closer.
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.pending_zoom *= factor;
        }
    }

    /// Applies part of the queued motion for a frame lasting `ts` seconds.
    pub fn update(&mut self, ts: f32) {
        let step = 1.0 - (1.0 - DAMPING).powf(ts.max(0.0) * 60.0);

        let yaw = self.pending_yaw * step;
        let pitch = self.pending_pitch * step;
        self.yaw = (self.yaw + yaw) % 360.0;
        self.pitch = (self.pitch + pitch).clamp(-MAX_PITCH, MAX_PITCH);
        self.pending_yaw -= yaw;
        self.pending_pitch -= pitch;

        let zoom = self.pending_zoom.powf(step);
        self.distance = (self.distance * zoom).clamp(MIN_DISTANCE, MAX_DISTANCE);
        self.pending_zoom /= zoom;
    }

    pub fn view_matrix(&self) -> cgmath::Matrix4<f32> {
        let axes = self.calculate_axes();
        let eye = self.position();
        cgmath::Matrix4::look_to_rh(cgmath::point3(eye.x, eye.y, eye.z), axes.forward, axes.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> cgmath::Matrix4<f32> {
        opengl_to_wgpu()
            * cgmath::perspective(
                cgmath::Rad::from(cgmath::Deg(FOV_DEGREES)),
                aspect.max(f32::EPSILON),
                NEAR,
                FAR,
            )
    }

    pub fn to_gpu(&self, aspect: f32) -> GpuCamera {
        GpuCamera {
            view_matrix: self.view_matrix(),
            projection_matrix: self.projection_matrix(aspect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: cgmath::Vector3<f32>, b: cgmath::Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn starts_where_it_was_placed() {
        for position in [cgmath::vec3(0.0, -0.5, -0.1), cgmath::vec3(0.0, 0.0, -0.1), cgmath::vec3(3.0, 1.0, 2.0)] {
            let camera = Camera::new(position);
            assert!(close(camera.position(), position), "{position:?}");
        }
    }

    #[test]
    fn looks_at_the_origin() {
        let camera = Camera::new(cgmath::vec3(1.0, 2.0, 3.0));
        let origin = camera.view_matrix() * cgmath::vec4(0.0, 0.0, 0.0, 1.0);
        assert!(origin.x.abs() < 1e-4 && origin.y.abs() < 1e-4);
        assert!(origin.z < 0.0);
    }

    #[test]
    fn damped_rotation_converges_on_the_full_delta() {
        let mut camera = Camera::new(cgmath::vec3(0.0, 0.0, 2.0));
        let yaw = camera.yaw;
        camera.rotate(30.0, 0.0);
        camera.update(1.0 / 60.0);
        assert!((camera.yaw - yaw - 1.5).abs() < 1e-3);
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
        assert!((camera.yaw - yaw - 30.0).abs() < 1e-2);
        assert!((camera.distance - 2.0).abs() < 1e-4);
    }

    #[test]
    fn zoom_and_pitch_are_clamped() {
        let mut camera = Camera::new(cgmath::vec3(0.0, 0.0, 1.0));
        camera.rotate(0.0, 1000.0);
        camera.zoom(1e-6);
        for _ in 0..2000 {
            camera.update(1.0 / 30.0);
        }
        assert!(camera.pitch <= MAX_PITCH);
        assert!(camera.distance >= MIN_DISTANCE);
    }

    #[test]
    fn projection_maps_depth_into_zero_one() {
        let camera = Camera::new(cgmath::vec3(0.0, 0.0, 1.0));
        let proj = camera.projection_matrix(1.0);
        let near = proj * cgmath::vec4(0.0, 0.0, -NEAR, 1.0);
        let far = proj * cgmath::vec4(0.0, 0.0, -FAR, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn collapsed_viewport_still_projects() {
        let camera = Camera::new(cgmath::vec3(0.0, -0.5, -0.1));
        for aspect in [0.0, -1.0, f32::NAN] {
            let proj = camera.projection_matrix(aspect);
            let entries: &[f32; 16] = proj.as_ref();
            assert!(entries.iter().all(|v| v.is_finite()), "{aspect}");
        }
    }
}
