//! Icosphere geometry with equirectangular UVs.

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

use glam::Vec3;

/// Triangle mesh shared by the earth layers.
#[derive(Clone, Debug)]
pub struct SphereGeometry {
    pub radius: f32,
    pub positions: Vec<Vec3>,
    /// Outward unit normals.
    pub normals: Vec<Vec3>,
    /// Texture coordinates, `v = 0` at the north pole.
    pub uvs: Vec<[f32; 2]>,
    /// Counter-clockwise triangles seen from outside.
    pub indices: Vec<u32>,
}

impl SphereGeometry {
    /// Subdivided icosahedron of the given radius.
    ///
    /// Each subdivision splits every triangle into four, so detail `d` has
    /// `20 * 4^d` triangles. Vertices on the texture seam and at the poles are
    /// duplicated so equirectangular maps wrap without smearing.
    pub fn icosphere(radius: f32, detail: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;

        let mut positions: Vec<Vec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();

        let mut indices: Vec<u32> = vec![
            0, 11, 5, 0, 5, 1, 0, 1, 7, 0, 7, 10, 0, 10, 11, 1, 5, 9, 5, 11, 4, 11, 10, 2, 10, 7,
            6, 7, 1, 8, 3, 9, 4, 3, 4, 2, 3, 2, 6, 3, 6, 8, 3, 8, 9, 4, 9, 5, 2, 4, 11, 6, 2, 10,
            8, 6, 7, 9, 8, 1,
        ];

        for _ in 0..detail {
            subdivide(&mut positions, &mut indices);
        }

        let mut uvs: Vec<[f32; 2]> = positions.iter().map(|&p| equirect_uv(p)).collect();
        fix_seam_and_poles(&mut positions, &mut uvs, &mut indices);

        let normals = positions.clone();
        let positions = positions.into_iter().map(|p| p * radius).collect();

        Self {
            radius,
            positions,
            normals,
            uvs,
            indices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// UV for a unit direction. `u` grows eastward when viewed from outside.
fn equirect_uv(p: Vec3) -> [f32; 2] {
    let u = 0.5 + p.z.atan2(-p.x) / TAU;
    let v = 0.5 - p.y.clamp(-1.0, 1.0).asin() / PI;
    [u, v]
}

/// Split each triangle into four at edge midpoints, projected onto the sphere.
fn subdivide(positions: &mut Vec<Vec3>, indices: &mut Vec<u32>) {
    let mut midpoint_cache: HashMap<(u32, u32), u32> = HashMap::new();
    let mut new_indices = Vec::with_capacity(indices.len() * 4);

    let mut midpoint = |a: u32, b: u32, pos: &mut Vec<Vec3>| -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        *midpoint_cache.entry(key).or_insert_with(|| {
            let idx = pos.len() as u32;
            pos.push((pos[a as usize] + pos[b as usize]).normalize());
            idx
        })
    };

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0], tri[1], tri[2]);
        let ab = midpoint(a, b, positions);
        let bc = midpoint(b, c, positions);
        let ca = midpoint(c, a, positions);

        new_indices.extend_from_slice(&[a, ab, ca]);
        new_indices.extend_from_slice(&[b, bc, ab]);
        new_indices.extend_from_slice(&[c, ca, bc]);
        new_indices.extend_from_slice(&[ab, bc, ca]);
    }

    *indices = new_indices;
}

const POLE_EPSILON: f32 = 1e-6;

fn is_pole(p: Vec3) -> bool {
    p.y.abs() > 1.0 - POLE_EPSILON
}

/// Give seam-straddling triangles a wrapped copy of their low-`u` vertices and
/// every pole corner its own vertex with `u` centred on the triangle.
fn fix_seam_and_poles(positions: &mut Vec<Vec3>, uvs: &mut Vec<[f32; 2]>, indices: &mut [u32]) {
    let mut wrapped: HashMap<u32, u32> = HashMap::new();

    for tri in indices.chunks_exact_mut(3) {
        let us: Vec<f32> = tri
            .iter()
            .filter(|&&i| !is_pole(positions[i as usize]))
            .map(|&i| uvs[i as usize][0])
            .collect();
        let max_u = us.iter().copied().fold(f32::MIN, f32::max);
        let min_u = us.iter().copied().fold(f32::MAX, f32::min);

        if max_u - min_u > 0.5 {
            for corner in tri.iter_mut() {
                if is_pole(positions[*corner as usize]) || uvs[*corner as usize][0] >= 0.5 {
                    continue;
                }
                let original = *corner;
                *corner = *wrapped.entry(original).or_insert_with(|| {
                    let [u, v] = uvs[original as usize];
                    positions.push(positions[original as usize]);
                    uvs.push([u + 1.0, v]);
                    (positions.len() - 1) as u32
                });
            }
        }

        for k in 0..3 {
            if !is_pole(positions[tri[k] as usize]) {
                continue;
            }
            let others = [tri[(k + 1) % 3], tri[(k + 2) % 3]];
            let u = (uvs[others[0] as usize][0] + uvs[others[1] as usize][0]) / 2.0;
            let pole = tri[k] as usize;
            positions.push(positions[pole]);
            uvs.push([u, uvs[pole][1]]);
            tri[k] = (positions.len() - 1) as u32;
        }
    }
}
