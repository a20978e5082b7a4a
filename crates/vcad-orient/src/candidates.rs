//! Candidate build directions.
//!
//! Three independent generators propose directions that point *down* onto
//! the bed (the normal of the face that would rest on it):
//!
//! * [`area_cumulation`]: the largest flat surfaces of the mesh.
//! * [`death_star`]: normals of synthetic triangles spanned by random
//!   vertex triples, which reveal planes the real tessellation hides.
//! * [`supplements`]: a fixed set of axis and diagonal directions.
//!
//! Their output is concatenated and then thinned by [`remove_duplicates`].

use std::collections::HashMap;

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::mesh::MeshTable;
use crate::Vec3;

/// Sampled normals are rounded to this many decimals before counting.
const SAMPLE_DECIMALS: i32 = 6;

/// Sampled normals seen this often or less are noise.
const MIN_SAMPLE_HITS: usize = 2;

/// Total synthetic faces per search, spread over the mesh.
const SAMPLE_BUDGET: usize = 20_000;

/// Angular tolerance below which two candidates are duplicates.
pub const DUPLICATE_ANGLE_DEG: f64 = 5.0;

/// Which generator proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateSource {
    /// The mesh's current orientation.
    Default,
    /// Summed area of coplanar faces.
    AreaCumulation,
    /// Random synthetic faces.
    DeathStar,
    /// Fixed canonical direction.
    Supplement,
}

/// A direction to test as the bed normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Unit vector pointing down onto the bed.
    pub direction: Vec3,
    /// Generator-specific strength: summed area, sample count, or zero.
    pub weight: f64,
    /// Generator that proposed it.
    pub source: CandidateSource,
}

impl Candidate {
    /// The unrotated mesh: world down.
    pub fn unrotated() -> Self {
        Self {
            direction: -Vec3::z(),
            weight: 0.0,
            source: CandidateSource::Default,
        }
    }

    /// Up vector of the print if this candidate wins.
    pub fn alignment(&self) -> Vec3 {
        -self.direction
    }
}

/// Quantize a unit vector into a hashable grouping key.
fn direction_key(v: &Vec3) -> [i64; 3] {
    let scale = 10f64.powi(SAMPLE_DECIMALS);
    [v.x, v.y, v.z].map(|c| (c * scale).round() as i64)
}

/// Round each component to the sampling precision.
fn round_direction(v: &Vec3) -> Vec3 {
    let scale = 10f64.powi(SAMPLE_DECIMALS);
    v.map(|c| (c * scale).round() / scale)
}

/// Accumulates weights per direction, remembering first-seen order so that
/// ties rank deterministically.
#[derive(Default)]
struct DirectionTally {
    index: HashMap<[i64; 3], usize>,
    entries: Vec<(Vec3, f64)>,
}

impl DirectionTally {
    fn add(&mut self, direction: Vec3, weight: f64) {
        let key = direction_key(&direction);
        match self.index.get(&key) {
            Some(&i) => self.entries[i].1 += weight,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((direction, weight));
            }
        }
    }

    /// The `n` heaviest directions, heaviest first.
    fn most_common(mut self, n: usize) -> Vec<(Vec3, f64)> {
        self.entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        self.entries.truncate(n);
        self.entries
    }
}

/// The `best_n` face normals with the largest summed area.
///
/// Faces of one flat surface share a normal up to rounding, so they are
/// grouped by the normal quantized to six decimals. The first face seen
/// supplies the group's exact direction.
pub fn area_cumulation(table: &MeshTable, best_n: usize) -> Vec<Candidate> {
    let mut tally = DirectionTally::default();
    for face in table.faces() {
        tally.add(face.normal, face.area);
    }

    tally
        .most_common(best_n)
        .into_iter()
        .map(|(direction, area)| Candidate {
            direction,
            weight: area,
            source: CandidateSource::AreaCumulation,
        })
        .collect()
}

/// Number of sampling rounds for a table of `faces` faces. Small meshes get
/// more rounds to make up for fewer samples per round.
pub fn death_star_iterations(faces: usize) -> usize {
    SAMPLE_BUDGET.div_ceil(faces + 100)
}

/// The `best_n` most frequent normals of synthetic faces, plus their
/// antiparallels.
///
/// Each round builds one synthetic triangle per face: two corners of the
/// face, chosen at random, and a corner of another face picked by a linear
/// congruential step. Normals seen only once or twice are dropped.
pub fn death_star<R: Rng + ?Sized>(
    table: &MeshTable,
    best_n: usize,
    rng: &mut R,
) -> Vec<Candidate> {
    let faces = table.faces();
    let n = faces.len();
    if n == 0 {
        return Vec::new();
    }

    let mut tally = DirectionTally::default();
    for i in 0..death_star_iterations(n) {
        let pair = index::sample(rng, 3, 2);
        let (a, b) = (pair.index(0), pair.index(1));

        for (j, face) in faces.iter().enumerate() {
            let v0 = face.vertices[a];
            let v1 = face.vertices[b];
            let v2 = faces[(j * 127 + 8191 + i) % n].vertices[i % 3];

            let normal = (v2 - v0).cross(&(v1 - v0));
            let length = normal.norm();
            if !length.is_finite() || length <= f64::EPSILON {
                continue;
            }
            let direction = round_direction(&(normal / length));
            if direction.iter().all(|c| c.is_finite()) {
                tally.add(direction, 1.0);
            }
        }
    }

    let top: Vec<Candidate> = tally
        .most_common(best_n)
        .into_iter()
        .filter(|(_, hits)| *hits > MIN_SAMPLE_HITS as f64)
        .map(|(direction, hits)| Candidate {
            direction,
            weight: hits,
            source: CandidateSource::DeathStar,
        })
        .collect();

    // A flat surface yields synthetic faces of both windings.
    let anti: Vec<Candidate> = top
        .iter()
        .map(|c| Candidate {
            direction: -c.direction,
            ..*c
        })
        .collect();

    top.into_iter().chain(anti).collect()
}

/// Fixed field of 18 axis-aligned and 45° directions, with zero weight.
pub fn supplements() -> Vec<Candidate> {
    let d = std::f64::consts::FRAC_1_SQRT_2;
    let directions = [
        [0.0, 0.0, -1.0],
        [d, 0.0, -d],
        [0.0, d, -d],
        [-d, 0.0, -d],
        [0.0, -d, -d],
        [1.0, 0.0, 0.0],
        [d, d, 0.0],
        [0.0, 1.0, 0.0],
        [-d, d, 0.0],
        [-1.0, 0.0, 0.0],
        [-d, -d, 0.0],
        [0.0, -1.0, 0.0],
        [d, -d, 0.0],
        [d, 0.0, d],
        [0.0, d, d],
        [-d, 0.0, d],
        [0.0, -d, d],
        [0.0, 0.0, 1.0],
    ];

    directions
        .iter()
        .map(|&[x, y, z]| Candidate {
            direction: Vec3::new(x, y, z),
            weight: 0.0,
            source: CandidateSource::Supplement,
        })
        .collect()
}

/// Chordal distance between unit vectors separated by `angle_deg`, for
/// small angles.
pub fn duplicate_tolerance(angle_deg: f64) -> f64 {
    angle_deg.to_radians().sin()
}

/// Drop candidates within `tolerance` (Euclidean distance between unit
/// vectors) of an earlier kept one. Order preserving; the first of a cluster
/// survives.
pub fn remove_duplicates(candidates: Vec<Candidate>, tolerance: f64) -> Vec<Candidate> {
    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|k| (k.direction - candidate.direction).norm() < tolerance);
        if !duplicate {
            kept.push(candidate);
        }
    }
    kept
}
