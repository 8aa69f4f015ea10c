//! Deterministic 2D gradient noise with octave summation.
//!
//! [`NoiseField::sample`] evaluates a single octave of gradient noise and
//! [`NoiseField::fractal`] sums several octaves into clamped fractal noise.
//! Gradients are derived from a fixed integer hash of the lattice corner, so
//! the field is reproducible bit-for-bit without any seed state.

use std::f32::consts::PI;

use glam::Vec2;

/// Default number of summed octaves
pub const DEFAULT_OCTAVES: u32 = 12;

/// Default gain applied to the octave sum before clamping
pub const DEFAULT_GAIN: f32 = 1.2;

/// Coherent noise field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseField {
    /// Number of octaves summed by [`NoiseField::fractal`]
    pub octaves: u32,
    /// Multiplier applied to the octave sum before clamping
    pub gain: f32,
}

impl Default for NoiseField {
    fn default() -> Self {
        Self {
            octaves: DEFAULT_OCTAVES,
            gain: DEFAULT_GAIN,
        }
    }
}

impl NoiseField {
    pub fn new(octaves: u32, gain: f32) -> Self {
        Self { octaves, gain }
    }

    /// Pseudo-random unit gradient for the lattice corner `(ix, iy)`.
    ///
    /// The hash works on the two's complement bit pattern of the
    /// coordinates, so negative corners take the same path as positive ones.
    pub fn gradient(ix: i32, iy: i32) -> Vec2 {
        const HALF_BITS: u32 = u32::BITS / 2;

        let mut a = ix as u32;
        let mut b = iy as u32;

        a = a.wrapping_mul(3_284_157_443);
        b ^= a.rotate_left(HALF_BITS);
        b = b.wrapping_mul(1_911_520_717);
        a ^= b.rotate_left(HALF_BITS);
        a = a.wrapping_mul(2_048_419_325);

        // Map the full u32 range onto [0, 2*PI)
        let angle = a as f32 * (PI / (1u32 << 31) as f32);
        Vec2::new(angle.sin(), angle.cos())
    }

    /// Single-octave gradient noise at `(x, y)`.
    ///
    /// Evaluates to exactly zero on lattice points.
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        gradient_noise(x, y)
    }

    /// Fractal noise: octave sum scaled by `gain`, clamped to `[-1, 1]`.
    pub fn fractal(&self, x: f32, y: f32) -> f32 {
        let mut value = 0.0;
        let mut frequency = 1.0;
        let mut amplitude = 1.0;

        for _ in 0..self.octaves {
            value += gradient_noise(x * frequency, y * frequency) * amplitude;
            frequency *= 2.0;
            amplitude /= 2.0;
        }

        (value * self.gain).clamp(-1.0, 1.0)
    }
}

fn gradient_noise(x: f32, y: f32) -> f32 {
    if !x.is_finite() || !y.is_finite() {
        return 0.0;
    }

    let fx = x.floor();
    let fy = y.floor();
    let x0 = lattice_index(fx);
    let y0 = lattice_index(fy);
    let x1 = x0.wrapping_add(1);
    let y1 = y0.wrapping_add(1);

    // Offsets within the cell stay in [0, 1) however far from the origin
    let sx = x - fx;
    let sy = y - fy;

    let n0 = dot_grid_gradient(x0, y0, sx, sy);
    let n1 = dot_grid_gradient(x1, y0, sx - 1.0, sy);
    let ix0 = interpolate(n0, n1, sx);

    let n0 = dot_grid_gradient(x0, y1, sx, sy - 1.0);
    let n1 = dot_grid_gradient(x1, y1, sx - 1.0, sy - 1.0);
    let ix1 = interpolate(n0, n1, sx);

    interpolate(ix0, ix1, sy)
}

/// Lattice coordinate wrapped into the 32-bit hash domain
fn lattice_index(floor: f32) -> i32 {
    (floor as i64).rem_euclid(1 << 32) as u32 as i32
}

/// Dot product of the corner gradient with the offset from the corner
fn dot_grid_gradient(ix: i32, iy: i32, dx: f32, dy: f32) -> f32 {
    NoiseField::gradient(ix, iy).dot(Vec2::new(dx, dy))
}

/// Cubic smoothstep interpolation, C1 continuous at the lattice
fn interpolate(a0: f32, a1: f32, w: f32) -> f32 {
    (a1 - a0) * (3.0 - w * 2.0) * w * w + a0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_is_deterministic() {
        for &(ix, iy) in &[(0, 0), (1, 0), (0, 1), (17, -3), (-42, -42), (i32::MAX, i32::MIN)] {
            assert_eq!(NoiseField::gradient(ix, iy), NoiseField::gradient(ix, iy));
        }
    }

    #[test]
    fn test_gradient_is_unit_length() {
        for ix in -20..20 {
            for iy in -20..20 {
                let g = NoiseField::gradient(ix, iy);
                assert!((g.length() - 1.0).abs() < 1e-5, "gradient at ({ix}, {iy}) = {g}");
            }
        }
    }

    #[test]
    fn test_gradient_is_order_sensitive() {
        assert_ne!(NoiseField::gradient(3, 7), NoiseField::gradient(7, 3));
    }

    #[test]
    fn test_sample_is_zero_on_lattice() {
        let noise = NoiseField::default();
        assert_eq!(noise.sample(0.0, 0.0), 0.0);
        for ix in -5..5 {
            for iy in -5..5 {
                assert_eq!(noise.sample(ix as f32, iy as f32), 0.0);
            }
        }
    }

    #[test]
    fn test_fractal_is_zero_on_lattice() {
        let noise = NoiseField::default();
        assert_eq!(noise.fractal(0.0, 0.0), 0.0);
        assert_eq!(noise.fractal(3.0, -2.0), 0.0);
    }

    #[test]
    fn test_sample_within_range() {
        let noise = NoiseField::default();
        for i in 0..200 {
            for j in 0..200 {
                let x = (i as f32 - 100.0) * 0.137;
                let y = (j as f32 - 100.0) * 0.071;
                let single = noise.sample(x, y);
                let fractal = noise.fractal(x, y);
                assert!((-1.0..=1.0).contains(&single));
                assert!((-1.0..=1.0).contains(&fractal));
            }
        }
    }

    #[test]
    fn test_high_gain_is_clamped() {
        let noise = NoiseField::new(12, 1000.0);
        for i in 0..100 {
            let v = noise.fractal(i as f32 * 0.173 + 0.05, i as f32 * 0.311 + 0.05);
            assert!((-1.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_sample_is_continuous_across_origin() {
        let noise = NoiseField::default();
        let eps = 1e-3;
        for &(x, y) in &[(0.0, 0.3), (0.4, 0.0), (0.0, -0.6), (-0.25, 0.0)] {
            let a = noise.sample(x - eps, y - eps);
            let b = noise.sample(x + eps, y + eps);
            assert!((a - b).abs() < 0.01, "jump at ({x}, {y}): {a} vs {b}");
        }
    }

    #[test]
    fn test_sample_varies_between_lattice_points() {
        let noise = NoiseField::default();
        let values: Vec<f32> = (0..16)
            .map(|i| noise.sample(i as f32 + 0.5, 0.5))
            .collect();
        assert!(values.iter().any(|v| v.abs() > 1e-3));
    }

    #[test]
    fn test_far_coordinates_stay_in_range() {
        let noise = NoiseField::default();
        for &x in &[3.0e9 + 0.5, -3.0e9, 1.0e12, -7.5e15, 2.5e30] {
            for &y in &[0.5, -0.25, 4.0e9] {
                let single = noise.sample(x, y);
                let fractal = noise.fractal(x, y);
                assert!((-1.0..=1.0).contains(&single), "sample({x}, {y}) = {single}");
                assert!((-1.0..=1.0).contains(&fractal), "fractal({x}, {y}) = {fractal}");
            }
        }
    }

    #[test]
    fn test_non_finite_coordinates_are_flat() {
        let noise = NoiseField::default();
        assert_eq!(noise.sample(f32::NAN, 0.5), 0.0);
        assert_eq!(noise.sample(0.5, f32::INFINITY), 0.0);
        assert_eq!(noise.fractal(f32::NEG_INFINITY, 0.5), 0.0);
    }

    #[test]
    fn test_lattice_index_wraps() {
        assert_eq!(lattice_index(-1.0), -1);
        assert_eq!(lattice_index(2_147_483_648.0), i32::MIN);
        assert_eq!(lattice_index(4_294_967_296.0), 0);
    }

    #[test]
    fn test_zero_octaves_is_flat() {
        let noise = NoiseField::new(0, 1.2);
        assert_eq!(noise.fractal(0.3, 0.7), 0.0);
    }
}
