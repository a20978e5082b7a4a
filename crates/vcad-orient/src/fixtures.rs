//! Test meshes as flat nine-floats-per-face triangle data.

use nalgebra::{Rotation3, Vector3};

use crate::{Point3, Vec3};

/// Outward-wound corner indices of an axis-aligned box.
const BOX_INDICES: [usize; 36] = [
    0, 2, 1, 0, 3, 2, // bottom
    4, 5, 6, 4, 6, 7, // top
    0, 1, 5, 0, 5, 4, // front
    2, 3, 7, 2, 7, 6, // back
    0, 4, 7, 0, 7, 3, // left
    1, 2, 6, 1, 6, 5, // right
];

/// Axis-aligned box with its minimum corner at `min`.
pub fn box_at(min: [f64; 3], size: [f64; 3]) -> Vec<f64> {
    let [x0, y0, z0] = min;
    let [x1, y1, z1] = [x0 + size[0], y0 + size[1], z0 + size[2]];
    let corners = [
        [x0, y0, z0],
        [x1, y0, z0],
        [x1, y1, z0],
        [x0, y1, z0],
        [x0, y0, z1],
        [x1, y0, z1],
        [x1, y1, z1],
        [x0, y1, z1],
    ];
    BOX_INDICES.iter().flat_map(|&i| corners[i]).collect()
}

/// Box with one corner at the origin.
pub fn box_mesh(x: f64, y: f64, z: f64) -> Vec<f64> {
    box_at([0.0; 3], [x, y, z])
}

/// Cube with one corner at the origin.
pub fn cube(size: f64) -> Vec<f64> {
    box_mesh(size, size, size)
}

/// Right triangle in the XY plane facing -Z.
pub fn down_triangle(size: f64) -> Vec<f64> {
    vec![0.0, 0.0, 0.0, 0.0, size, 0.0, size, 0.0, 0.0]
}

/// `n` x `n` grid of square cells in the XY plane, two triangles per cell.
pub fn grid_plate(n: usize, cell: f64) -> Vec<f64> {
    let mut data = Vec::with_capacity(n * n * 18);
    for i in 0..n {
        for j in 0..n {
            let (x0, y0) = (i as f64 * cell, j as f64 * cell);
            let (x1, y1) = (x0 + cell, y0 + cell);
            data.extend_from_slice(&[x0, y0, 0.0, x1, y0, 0.0, x1, y1, 0.0]);
            data.extend_from_slice(&[x0, y0, 0.0, x1, y1, 0.0, x0, y1, 0.0]);
        }
    }
    data
}

/// A 20 x 20 x 2 slab on a 2 x 2 x 10 leg. The slab's underside is a flat
/// ceiling 10 mm above the bed. The leg has no top face.
pub fn table_top() -> Vec<f64> {
    let mut data = box_at([0.0, 0.0, 10.0], [20.0, 20.0, 2.0]);
    let leg = box_at([9.0, 9.0, 0.0], [2.0, 2.0, 10.0]);
    data.extend_from_slice(&leg[..18]);
    data.extend_from_slice(&leg[36..]);
    data
}

/// Open cone (no base cap) with `segments` side faces, tilted away from the
/// axes. Returns the data and the cone's axis (base to apex) after tilting.
pub fn tilted_cone(segments: usize, radius: f64, height: f64) -> (Vec<f64>, Vec3) {
    let tilt = Rotation3::from_axis_angle(&Vector3::z_axis(), 30f64.to_radians())
        * Rotation3::from_axis_angle(&Vector3::x_axis(), 20f64.to_radians());

    let ring: Vec<Point3> = (0..segments)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / segments as f64;
            tilt * Point3::new(radius * theta.cos(), radius * theta.sin(), 0.0)
        })
        .collect();
    let apex = tilt * Point3::new(0.0, 0.0, height);

    let mut data = Vec::with_capacity(segments * 9);
    for i in 0..segments {
        for p in [ring[i], ring[(i + 1) % segments], apex] {
            data.extend_from_slice(&[p.x, p.y, p.z]);
        }
    }
    (data, tilt * Vec3::z())
}
