//! Projection of the face table onto a build direction and the bottom,
//! overhang and contour metrics derived from it.

use serde::{Deserialize, Serialize};

use crate::mesh::MeshTable;
use crate::{OrientSettings, Vec3};

/// Componentwise tolerance for recognising a flat ceiling.
const PLAFOND_TOL: f64 = 1e-6;

/// Metrics of one build direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverhangScore {
    /// Area resting on the bed.
    pub bottom: f64,
    /// Overhang penalty (area, or height-weighted area in min-volume mode).
    pub overhang: f64,
    /// Length of the bed-level contour.
    pub contour: f64,
}

/// Per-face projections for the build direction currently scored.
///
/// Kept apart from [`MeshTable`] so that the table stays shared and
/// read-only; each scoring worker owns one buffer and overwrites it per
/// direction.
#[derive(Debug, Clone, Default)]
pub struct ProjectionBuffer {
    heights: Vec<[f64; 3]>,
    max: Vec<f64>,
    median: Vec<f64>,
    total_min: f64,
}

impl ProjectionBuffer {
    /// Empty buffer; sized on first projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding the table's vertex heights along world Z.
    pub fn along_z(table: &MeshTable) -> Self {
        let mut buffer = Self::new();
        buffer.project(table, &Vec3::z());
        buffer
    }

    /// Project every vertex onto `alignment`, recompute per-face max and
    /// median, and return the lowest projection of the mesh.
    pub fn project(&mut self, table: &MeshTable, alignment: &Vec3) -> f64 {
        let faces = table.faces();
        self.heights.clear();
        self.max.clear();
        self.median.clear();
        self.heights.reserve(faces.len());
        self.max.reserve(faces.len());
        self.median.reserve(faces.len());

        let mut total_min = f64::INFINITY;
        for face in faces {
            let h = face.vertices.map(|v| v.coords.dot(alignment));
            let (lo, mid, hi) = sort3(h);
            self.heights.push(h);
            self.median.push(mid);
            self.max.push(hi);
            total_min = total_min.min(lo);
        }

        self.total_min = total_min;
        total_min
    }

    /// Vertex heights of each face, in vertex order.
    pub fn heights(&self) -> &[[f64; 3]] {
        &self.heights
    }

    /// Highest vertex of each face.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Median vertex of each face.
    pub fn median(&self) -> &[f64] {
        &self.median
    }

    /// Lowest vertex of the whole mesh.
    pub fn total_min(&self) -> f64 {
        self.total_min
    }
}

/// Score the table for build direction `alignment` (the up vector after
/// rotation). `buffer` is overwritten.
pub fn score_orientation(
    table: &MeshTable,
    buffer: &mut ProjectionBuffer,
    alignment: &Vec3,
    settings: &OrientSettings,
) -> OverhangScore {
    let params = &settings.parameters;
    let ascent = settings.critical_angle.to_radians().cos();
    let total_min = buffer.project(table, alignment);
    let band = total_min + params.first_layer_height;
    let faces = table.faces();

    let bottom: f64 = faces
        .iter()
        .zip(&buffer.max)
        .filter(|(_, &max)| max < band)
        .map(|(face, _)| face.area)
        .sum();

    let mut overhang = 0.0;
    let mut plafond = 0.0;
    for (face, &max) in faces.iter().zip(&buffer.max) {
        let inner = face.normal.dot(alignment) - ascent;
        if inner >= 0.0 || max <= band {
            continue;
        }
        let mut penalty = 2.0 * face.area * inner * inner;
        if settings.min_volume {
            penalty *= face.centroid().coords.dot(alignment) - total_min;
        }
        overhang += penalty;

        if settings.extended_mode && is_plafond(&face.normal, alignment) {
            plafond += face.area;
        }
    }
    let overhang = (overhang - params.plafond_advantage * plafond).max(0.0);

    let contour = if settings.extended_mode {
        contour_length(table, buffer, band, params.contour_amount)
    } else {
        // Treat the bottom as a square.
        4.0 * bottom.sqrt()
    };

    OverhangScore {
        bottom,
        overhang,
        contour,
    }
}

/// Total length of the bed-level edges of faces straddling the first layer.
fn contour_length(table: &MeshTable, buffer: &ProjectionBuffer, band: f64, amount: f64) -> f64 {
    let mut length = 0.0;
    let mut edges = 0usize;

    for (i, face) in table.faces().iter().enumerate() {
        if buffer.median[i] >= band || buffer.max[i] <= band {
            continue;
        }
        let h = buffer.heights[i];
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| h[a].total_cmp(&h[b]));
        length += (face.vertices[order[0]] - face.vertices[order[1]]).norm();
        edges += 1;
    }

    if edges == 0 {
        return amount;
    }
    length + amount * edges as f64
}

fn is_plafond(normal: &Vec3, alignment: &Vec3) -> bool {
    (normal + alignment).amax() <= PLAFOND_TOL
}

fn sort3([a, b, c]: [f64; 3]) -> (f64, f64, f64) {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if c <= lo {
        (c, lo, hi)
    } else if c >= hi {
        (lo, hi, c)
    } else {
        (lo, c, hi)
    }
}
