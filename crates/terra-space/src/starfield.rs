//! Procedural starfield: points scattered uniformly over directions on a
//! spherical shell around the origin, tinted a pale blue of varying brightness.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use terra_materials::{Color, Hsl, PointsMaterial, TextureRef};
use thiserror::Error;

/// Inner radius of the star shell.
pub const MIN_RADIUS: f32 = 25.0;
/// Radial thickness of the star shell.
pub const SHELL_DEPTH: f32 = 25.0;
/// Largest `f32` strictly below `MIN_RADIUS + SHELL_DEPTH`.
const MAX_RADIUS_BELOW: f32 = 49.999_996;

/// Hue shared by every star.
pub const STAR_HUE: f32 = 0.6;
/// Saturation shared by every star.
pub const STAR_SATURATION: f32 = 0.2;
/// World-space sprite size.
pub const STAR_SIZE: f32 = 0.2;

/// Errors raised for starfield inputs that come from untyped sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StarfieldError {
    /// Star counts must be non-negative and fit in a `u32`.
    #[error("invalid star count {0}: must be between 0 and {max}", max = u32::MAX)]
    InvalidStarCount(i64),
}

/// Parameters for [`StarfieldGenerator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    /// Number of stars to generate.
    pub num_stars: u32,
    /// Round sprite drawn for every point, relative to the texture directory.
    pub sprite: TextureRef,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            num_stars: 500,
            sprite: TextureRef::new("stars/circle.png"),
        }
    }
}

impl StarfieldConfig {
    /// Config with `count` stars, rejecting negative or oversized counts.
    pub fn from_count(count: i64) -> Result<Self, StarfieldError> {
        let num_stars = u32::try_from(count).map_err(|_| StarfieldError::InvalidStarCount(count))?;
        Ok(Self {
            num_stars,
            ..Self::default()
        })
    }
}

/// One generated star.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarPoint {
    pub position: glam::Vec3,
    /// Hue and saturation are fixed; lightness varies per star.
    pub color_hsl: Hsl,
    /// Radius of the shell the star was sampled on, in `[25, 50)`.
    pub min_distance: f32,
}

/// Renderable point cloud.
///
/// `positions` and `colors` are flat `xyz` / `rgb` arrays: entries `3i..3i+3`
/// belong to `stars[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PointCloud {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub stars: Vec<StarPoint>,
    pub material: PointsMaterial,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Position of point `i` as a vector.
    pub fn position(&self, i: usize) -> Option<glam::Vec3> {
        let p = self.positions.get(3 * i..3 * i + 3)?;
        Some(glam::Vec3::new(p[0], p[1], p[2]))
    }
}

/// Generates starfield point clouds.
pub struct StarfieldGenerator;

impl StarfieldGenerator {
    /// Generate `config.num_stars` stars drawing from `rng`.
    ///
    /// Each star consumes four draws in order: radius, azimuth, polar
    /// coordinate, lightness. The same RNG state always yields the same cloud.
    pub fn generate<R: Rng + ?Sized>(config: &StarfieldConfig, rng: &mut R) -> PointCloud {
        let n = config.num_stars as usize;
        let mut positions = Vec::with_capacity(3 * n);
        let mut colors = Vec::with_capacity(3 * n);
        let mut stars = Vec::with_capacity(n);

        for _ in 0..n {
            let radius = (MIN_RADIUS + SHELL_DEPTH * rng.random::<f32>()).min(MAX_RADIUS_BELOW);
            let u = rng.random::<f32>();
            let v = rng.random::<f32>();
            let theta = u * std::f32::consts::TAU;
            // acos of a uniform variable gives equal-area coverage; no polar clustering.
            let phi = (2.0 * v - 1.0).clamp(-1.0, 1.0).acos();

            let position = glam::Vec3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            );

            let lightness = rng.random::<f32>();
            let color = Color::from_hsl(STAR_HUE, STAR_SATURATION, lightness);

            positions.extend_from_slice(&position.to_array());
            colors.extend_from_slice(&color.to_array());
            stars.push(StarPoint {
                position,
                color_hsl: Hsl {
                    h: STAR_HUE,
                    s: STAR_SATURATION,
                    l: lightness,
                },
                min_distance: radius,
            });
        }

        log::debug!("Generated starfield with {} points", stars.len());

        PointCloud {
            positions,
            colors,
            stars,
            material: PointsMaterial {
                size: STAR_SIZE,
                size_attenuation: true,
                vertex_colors: true,
                map: Some(config.sprite.clone()),
                ..PointsMaterial::default()
            },
        }
    }

    /// Deterministic generation from a seed.
    pub fn generate_seeded(config: &StarfieldConfig, seed: u64) -> PointCloud {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Self::generate(config, &mut rng)
    }

    /// Generation from the thread-local RNG.
    pub fn generate_random(config: &StarfieldConfig) -> PointCloud {
        Self::generate(config, &mut rand::rng())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(num_stars: u32, seed: u64) -> PointCloud {
        let config = StarfieldConfig {
            num_stars,
            ..StarfieldConfig::default()
        };
        StarfieldGenerator::generate_seeded(&config, seed)
    }

    #[test]
    fn test_default_config() {
        let config = StarfieldConfig::default();
        assert_eq!(config.num_stars, 500);
        assert_eq!(config.sprite, TextureRef::new("stars/circle.png"));
    }

    #[test]
    fn test_attribute_lengths_match_count() {
        for n in [0, 1, 7, 500, 2000] {
            let stars = cloud(n, 42);
            assert_eq!(stars.positions.len(), 3 * n as usize);
            assert_eq!(stars.colors.len(), 3 * n as usize);
            assert_eq!(stars.len(), n as usize);
        }
    }

    #[test]
    fn test_zero_stars_is_valid() {
        let stars = cloud(0, 1);
        assert!(stars.is_empty());
        assert!(stars.positions.is_empty());
        assert!(stars.colors.is_empty());
        assert_eq!(stars.material.size, STAR_SIZE);
        assert!(stars.position(0).is_none());
    }

    #[test]
    fn test_from_count_rejects_invalid() {
        assert_eq!(StarfieldConfig::from_count(2000).unwrap().num_stars, 2000);
        assert_eq!(StarfieldConfig::from_count(0).unwrap().num_stars, 0);
        assert_eq!(
            StarfieldConfig::from_count(-1),
            Err(StarfieldError::InvalidStarCount(-1))
        );
        assert_eq!(
            StarfieldConfig::from_count(i64::from(u32::MAX) + 1),
            Err(StarfieldError::InvalidStarCount(i64::from(u32::MAX) + 1))
        );
    }

    #[test]
    fn test_points_lie_in_shell() {
        let stars = cloud(5000, 42);
        for (i, star) in stars.stars.iter().enumerate() {
            assert!(
                (MIN_RADIUS..MIN_RADIUS + SHELL_DEPTH).contains(&star.min_distance),
                "Star {i} radius {} outside [25, 50)",
                star.min_distance
            );
            let len = star.position.length();
            assert!(
                (len - star.min_distance).abs() < 1e-3,
                "Star {i} position length {len} differs from radius {}",
                star.min_distance
            );
            assert!(len >= MIN_RADIUS - 1e-3 && len < MIN_RADIUS + SHELL_DEPTH);
        }
    }

    #[test]
    fn test_flat_arrays_match_star_records() {
        let stars = cloud(100, 9);
        for (i, star) in stars.stars.iter().enumerate() {
            assert_eq!(stars.position(i), Some(star.position));
            let expected = Color::from_hsl(star.color_hsl.h, star.color_hsl.s, star.color_hsl.l);
            assert_eq!(&stars.colors[3 * i..3 * i + 3], &expected.to_array());
        }
    }

    #[test]
    fn test_hue_and_saturation_fixed() {
        let stars = cloud(2000, 7);
        for (i, star) in stars.stars.iter().enumerate() {
            assert_eq!(star.color_hsl.h, STAR_HUE);
            assert_eq!(star.color_hsl.s, STAR_SATURATION);
            assert!((0.0..1.0).contains(&star.color_hsl.l), "Star {i} lightness");

            let rgb = &stars.colors[3 * i..3 * i + 3];
            let hsl = Color {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
            }
            .to_hsl();
            // Near-black and near-white stars lose hue precision.
            if hsl.l > 0.01 && hsl.l < 0.99 {
                assert!((hsl.h - STAR_HUE).abs() < 1e-3, "Star {i} hue {}", hsl.h);
                assert!((hsl.s - STAR_SATURATION).abs() < 1e-3, "Star {i} saturation {}", hsl.s);
            }
        }
    }

    #[test]
    fn test_direction_distribution_is_uniform() {
        let stars = cloud(20_000, 42);
        let n = stars.len() as f64;

        let cos_phi: Vec<f64> = stars
            .stars
            .iter()
            .map(|s| f64::from(s.position.z / s.position.length()))
            .collect();
        let mean = cos_phi.iter().sum::<f64>() / n;
        let var = cos_phi.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.03, "mean z/r = {mean}");
        assert!((var - 1.0 / 3.0).abs() < 0.02, "var z/r = {var}");

        let azimuths: Vec<f64> = stars
            .stars
            .iter()
            .map(|s| f64::from(s.position.y.atan2(s.position.x)).rem_euclid(std::f64::consts::TAU))
            .collect();
        let mean = azimuths.iter().sum::<f64>() / n;
        let var = azimuths.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n;
        let expected = std::f64::consts::TAU.powi(2) / 12.0;
        assert!((mean - std::f64::consts::PI).abs() < 0.1, "mean azimuth = {mean}");
        assert!((var - expected).abs() / expected < 0.05, "azimuth variance = {var}");
    }

    #[test]
    fn test_distribution_covers_every_octant() {
        let stars = cloud(5000, 42);
        let mut octant_counts = [0u32; 8];
        for star in &stars.stars {
            let d = star.position;
            let octant = ((d.x >= 0.0) as usize)
                | (((d.y >= 0.0) as usize) << 1)
                | (((d.z >= 0.0) as usize) << 2);
            octant_counts[octant] += 1;
        }
        for (i, &count) in octant_counts.iter().enumerate() {
            assert!(
                (400..=850).contains(&count),
                "Octant {i} has {count} stars, expected roughly 625"
            );
        }
    }

    #[test]
    fn test_same_seed_produces_same_cloud() {
        assert_eq!(cloud(1000, 123), cloud(1000, 123));
    }

    #[test]
    fn test_different_seed_produces_different_cloud() {
        let a = cloud(1000, 1);
        let b = cloud(1000, 9999);
        let differences = a
            .stars
            .iter()
            .zip(&b.stars)
            .filter(|(a, b)| (a.position - b.position).length() > 0.01)
            .count();
        assert!(differences > 900, "only {differences}/1000 stars differ");
    }

    #[test]
    fn test_injected_rng_matches_seeded() {
        let config = StarfieldConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(
            StarfieldGenerator::generate(&config, &mut rng),
            StarfieldGenerator::generate_seeded(&config, 5)
        );
    }

    #[test]
    fn test_material_settings() {
        let stars = StarfieldGenerator::generate_random(&StarfieldConfig::default());
        assert_eq!(stars.len(), 500);
        assert_eq!(stars.material.size, 0.2);
        assert!(stars.material.vertex_colors);
        assert!(stars.material.size_attenuation);
        assert_eq!(stars.material.map, Some(TextureRef::new("stars/circle.png")));
    }
}
