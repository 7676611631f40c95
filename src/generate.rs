//! Point-cloud generators, one per scene.
//!
//! Generation is deterministic for a given seed. Each lattice row draws from
//! its own [`StdRng`] derived from the seed and the row index, so rows are
//! generated in parallel without changing the result.

use std::f32::consts::TAU;

use cgmath::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::{Particle, PointCloud, SceneKind};

pub const PLANE_GAP: f32 = 15.0;

pub const FUNNEL_LENGTH: f32 = 15.0;
pub const FUNNEL_MAIN_RADIUS: f32 = 0.2;
pub const FUNNEL_OUTER_LIMIT: f32 = 0.99;
pub const FUNNEL_INNER_LIMIT: f32 = 0.08;

pub const GRID_SPACING: f32 = 0.04;
pub const GRID_CONVERGENCE: f32 = 0.5;
pub const GRID_DEPTH_OFFSET: f32 = 0.5;

pub const SPHERE_RADIUS: f32 = 0.13;
/// Fraction of a sphere scene's points that make up the scattered disc.
pub const SPHERE_DISC_SHARE: f32 = 0.65;
pub const SPHERE_DISC_EXTENT: cgmath::Vector3<f32> = cgmath::Vector3 { x: 1.0, y: 0.3, z: 1.0 };

pub const MOBIUS_RADIUS: f32 = 2.0;
pub const MOBIUS_SCALE: f32 = 0.06;

/// Point on a sphere of `radius` at azimuth `theta` and polar angle `phi`.
pub fn sphere_point(theta: f32, phi: f32, radius: f32) -> cgmath::Vector3<f32> {
    cgmath::vec3(
        phi.sin() * theta.cos() * radius,
        phi.sin() * theta.sin() * radius,
        phi.cos() * radius,
    )
}

/// Cylindrical coordinates around the y axis, with `theta = 0` on +z.
pub fn cylindrical(radius: f32, theta: f32, height: f32) -> cgmath::Vector3<f32> {
    cgmath::vec3(radius * theta.sin(), height, radius * theta.cos())
}

/// Point on the Möbius strip. `u` runs around the loop over `[0, 2π)` and
/// `v` across the strip width over `[-1, 1]`.
pub fn mobius_point(u: f32, v: f32) -> cgmath::Vector3<f32> {
    let r = MOBIUS_RADIUS + v * (u * 0.5).cos();
    cgmath::vec3(r * u.cos(), r * u.sin(), v * (u * 0.5).sin()) * MOBIUS_SCALE
}

/// Uniformly distributed polar angle, from a uniform sample in `[0, 1)`.
fn uniform_phi(sample: f32) -> f32 {
    (sample * 2.0 - 1.0).clamp(-1.0, 1.0).acos()
}

fn row_rng(seed: u64, row: u32) -> StdRng {
    StdRng::seed_from_u64(seed ^ (u64::from(row) + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn unit(rng: &mut StdRng) -> f32 {
    rng.gen_range(0.0..1.0)
}

/// Runs `point` over a `count × count` lattice in parallel, row by row.
/// `point` receives the row RNG, the flat index, and the `(x, y)` cell.
fn lattice<F>(count: u32, seed: u64, point: F) -> Vec<Particle>
where
    F: Fn(&mut StdRng, u32, u32, u32) -> Particle + Sync,
{
    (0..count)
        .into_par_iter()
        .flat_map_iter(|y| {
            let mut rng = row_rng(seed, y);
            (0..count)
                .map(|x| point(&mut rng, y * count + x, x, y))
                .collect::<Vec<_>>()
        })
        .collect()
}

pub fn plane(count: u32, seed: u64) -> PointCloud {
    let n = count as f32;
    let particles = lattice(count, seed, |rng, _, x, y| {
        let (u, v) = (y as f32 / n, x as f32 / n);
        Particle {
            position: cgmath::vec3((u - 0.5) * PLANE_GAP, (v - 0.5) * PLANE_GAP, 0.0),
            offset: unit(rng),
            speed_factor: 1.0,
            size_factor: 1.0,
            param: cgmath::vec2(u, v),
        }
    });

    PointCloud { kind: SceneKind::Plane, count, particles }
}

/// A hollow tunnel along +z. Radii skew towards `FUNNEL_MAIN_RADIUS`, with a
/// long tail outwards and a short one inwards.
pub fn funnel(count: u32, seed: u64) -> PointCloud {
    let particles = lattice(count, seed, |rng, _, _, _| {
        let z = unit(rng) * FUNNEL_LENGTH;
        let inout = (unit(rng) - 0.5) * 2.0;
        let limit = if inout >= 0.0 { FUNNEL_OUTER_LIMIT } else { FUNNEL_INNER_LIMIT };
        let radius = FUNNEL_MAIN_RADIUS + unit(rng).powi(3) * limit * inout;
        let angle = TAU * unit(rng);
        let ring = cylindrical(radius, angle, 0.0);

        Particle {
            position: cgmath::vec3(ring.x, ring.z, z),
            offset: unit(rng),
            speed_factor: 1.0,
            size_factor: 1.0,
            param: cgmath::vec2(radius, angle),
        }
    });

    PointCloud { kind: SceneKind::Funnel, count, particles }
}

/// A `count³` lattice centred on the xy axes and pushed `0.5` along +z.
pub fn grid(count: u32, seed: u64) -> PointCloud {
    let half = count as f32 / 2.0;
    let n = count as f32;
    let particles = (0..count)
        .into_par_iter()
        .flat_map_iter(|x| {
            let mut rng = row_rng(seed, x);
            (0..count)
                .flat_map(move |y| (0..count).map(move |z| (y, z)))
                .map(|(y, z)| {
                    let cell = cgmath::vec3(x as f32, y as f32, z as f32);
                    Particle {
                        position: (cell - cgmath::vec3(half, half, half)) * GRID_SPACING
                            + cgmath::vec3(0.0, 0.0, GRID_DEPTH_OFFSET),
                        offset: unit(&mut rng),
                        speed_factor: rng.gen_range(0.5..1.0),
                        size_factor: 1.0 - GRID_CONVERGENCE * (cell.z / n),
                        param: cgmath::vec2(cell.x / n, cell.y / n),
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    PointCloud { kind: SceneKind::Grid, count, particles }
}

/// A sphere shell surrounded by a flat scattered disc. The first
/// `SPHERE_DISC_SHARE` of the indices form the disc and stay still
/// (`speed_factor = 0`). The rest sit on the shell with `speed_factor = 1`.
pub fn sphere(count: u32, seed: u64) -> PointCloud {
    let threshold = (count * count) as f32 * SPHERE_DISC_SHARE;
    let particles = lattice(count, seed, |rng, i, _, _| {
        let theta = unit(rng) * TAU;
        let phi = uniform_phi(unit(rng));
        let on_shell = i as f32 >= threshold;

        let position = if on_shell {
            sphere_point(theta, phi, SPHERE_RADIUS)
        } else {
            let jitter = cgmath::vec3(unit(rng) - 0.5, unit(rng) - 0.5, unit(rng) - 0.5);
            jitter.mul_element_wise(SPHERE_DISC_EXTENT)
        };

        Particle {
            position,
            offset: unit(rng),
            speed_factor: if on_shell { 1.0 } else { 0.0 },
            size_factor: unit(rng),
            param: cgmath::vec2(theta, phi),
        }
    });

    PointCloud { kind: SceneKind::Sphere, count, particles }
}

/// Points spread along the strip in index order with a random position
/// across its width.
pub fn mobius(count: u32, seed: u64) -> PointCloud {
    let total = (count * count) as f32;
    let particles = lattice(count, seed, |rng, i, _, _| {
        let u = i as f32 / total * TAU;
        let v = (unit(rng) - 0.5) * 2.0;

        Particle {
            position: mobius_point(u, v),
            offset: unit(rng),
            speed_factor: unit(rng),
            size_factor: 1.0,
            param: cgmath::vec2(u, v),
        }
    });

    PointCloud { kind: SceneKind::Mobius, count, particles }
}

pub fn generate(kind: SceneKind, count: u32, seed: u64) -> PointCloud {
    match kind {
        SceneKind::Plane => plane(count, seed),
        SceneKind::Funnel => funnel(count, seed),
        SceneKind::Grid => grid(count, seed),
        SceneKind::Sphere => sphere(count, seed),
        SceneKind::Mobius => mobius(count, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The strip comes back to the same side after two loops.
    const MOBIUS_PERIOD: f32 = 2.0 * TAU;

    const EPS: f32 = 1e-5;

    #[test]
    fn plane_is_a_flat_lattice_spanning_the_gap() {
        let cloud = plane(16, 1);
        assert_eq!(cloud.len(), 256);

        let first = cloud.particles[0].position;
        assert!((first.x + PLANE_GAP / 2.0).abs() < EPS);
        assert!((first.y + PLANE_GAP / 2.0).abs() < EPS);

        // i = y * count + x walks y along the x axis.
        let next_row = cloud.particles[16].position;
        assert!((next_row.x - first.x - PLANE_GAP / 16.0).abs() < EPS);
        assert!((next_row.y - first.y).abs() < EPS);

        assert!(cloud.particles.iter().all(|p| p.position.z == 0.0));
    }

    #[test]
    fn funnel_points_stay_inside_the_tunnel() {
        let cloud = funnel(64, 7);
        assert_eq!(cloud.len(), 64 * 64);

        let min_r = FUNNEL_MAIN_RADIUS - FUNNEL_INNER_LIMIT;
        let max_r = FUNNEL_MAIN_RADIUS + FUNNEL_OUTER_LIMIT;
        for p in &cloud.particles {
            let r = p.position.truncate().magnitude();
            assert!(r >= min_r - EPS && r <= max_r + EPS, "radius {r}");
            assert!((0.0..FUNNEL_LENGTH).contains(&p.position.z));
            assert!((0.0..1.0).contains(&p.offset));
        }
    }

    #[test]
    fn grid_is_cubic_and_shrinks_with_depth() {
        let cloud = grid(8, 3);
        assert_eq!(cloud.len(), 512);

        let first = cloud.particles[0];
        assert!((first.position.x + 4.0 * GRID_SPACING).abs() < EPS);
        assert!((first.position.z - (GRID_DEPTH_OFFSET - 4.0 * GRID_SPACING)).abs() < EPS);
        assert_eq!(first.size_factor, 1.0);

        let deepest = cloud.particles[7];
        assert!((deepest.size_factor - (1.0 - GRID_CONVERGENCE * 7.0 / 8.0)).abs() < EPS);

        assert!(cloud.particles.iter().all(|p| (0.5..1.0).contains(&p.speed_factor)));
    }

    #[test]
    fn sphere_splits_into_disc_and_shell() {
        let count = 32;
        let cloud = sphere(count, 11);
        let threshold = (count * count) as f32 * SPHERE_DISC_SHARE;

        for (i, p) in cloud.particles.iter().enumerate() {
            if i as f32 >= threshold {
                assert!((p.position.magnitude() - SPHERE_RADIUS).abs() < 1e-4);
                assert_eq!(p.speed_factor, 1.0);
            } else {
                assert!(p.position.x.abs() <= 0.5);
                assert!(p.position.y.abs() <= 0.15);
                assert!(p.position.z.abs() <= 0.5);
                assert_eq!(p.speed_factor, 0.0);
            }
        }
    }

    #[test]
    fn mobius_points_lie_on_the_strip() {
        let cloud = mobius(32, 5);
        let inner = (MOBIUS_RADIUS - 1.0) * MOBIUS_SCALE;
        let outer = (MOBIUS_RADIUS + 1.0) * MOBIUS_SCALE;

        for p in &cloud.particles {
            let r = p.position.truncate().magnitude();
            assert!(r >= inner - EPS && r <= outer + EPS);
            assert!(p.position.z.abs() <= MOBIUS_SCALE + EPS);
            assert_eq!(p.position, mobius_point(p.param.x, p.param.y));
        }
    }

    #[test]
    fn mobius_strip_flips_after_one_loop() {
        let a = mobius_point(0.3 + TAU, 0.5);
        let b = mobius_point(0.3, -0.5);
        assert!((a - b).magnitude() < EPS);
        let c = mobius_point(0.3 + MOBIUS_PERIOD, 0.5);
        assert!((c - mobius_point(0.3, 0.5)).magnitude() < EPS);
    }

    #[test]
    fn same_seed_same_cloud() {
        for kind in SceneKind::ALL {
            let a = generate(kind, 8, 42);
            let b = generate(kind, 8, 42);
            assert_eq!(a.particles, b.particles, "{kind:?}");
        }
        assert_ne!(funnel(8, 1).particles, funnel(8, 2).particles);
        assert_ne!(sphere(8, 1).particles, sphere(8, 2).particles);
    }
}
