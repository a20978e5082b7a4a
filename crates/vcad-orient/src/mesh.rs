//! Face table construction from raw triangle data.

use crate::error::{OrientError, Result};
use crate::{OrientSettings, Point3, Vec3};

/// The small-face filter is only applied if more faces than this survive it.
pub const MIN_FILTERED_FACES: usize = 100;

/// Memory layout of raw triangle data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshLayout {
    /// Nine numbers per face: three vertices.
    Vertices,
    /// Twelve numbers per face: a normal followed by three vertices (STL).
    NormalsAndVertices,
}

impl MeshLayout {
    /// Number of floats describing one face.
    pub fn stride(self) -> usize {
        match self {
            Self::Vertices => 9,
            Self::NormalsAndVertices => 12,
        }
    }
}

/// One triangle of the face table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Unit outward normal.
    pub normal: Vec3,
    /// Corners in input order.
    pub vertices: [Point3; 3],
    /// Triangle area, possibly scaled by a favored side weight.
    pub area: f64,
}

impl Face {
    /// Center of mass of the triangle.
    pub fn centroid(&self) -> Point3 {
        let [a, b, c] = self.vertices;
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }
}

/// Per-face attribute table of a mesh.
///
/// Built once per search. Degenerate faces are dropped and, when enough
/// faces remain, tiny ones as well. The table is read-only afterwards; the
/// per-orientation projections live in [`crate::score::ProjectionBuffer`].
#[derive(Debug, Clone)]
pub struct MeshTable {
    faces: Vec<Face>,
    input_faces: usize,
}

impl MeshTable {
    /// Build a table from flat `[x0, y0, z0, x1, .., z2]` triangle data.
    pub fn from_vertices(data: &[f64], settings: &OrientSettings) -> Result<Self> {
        Self::build(data, MeshLayout::Vertices, settings)
    }

    /// Build a table from flat `[nx, ny, nz, x0, .., z2]` facet data.
    pub fn from_facets(data: &[f64], settings: &OrientSettings) -> Result<Self> {
        Self::build(data, MeshLayout::NormalsAndVertices, settings)
    }

    /// Build a table from flat triangle data in the given layout.
    pub fn build(data: &[f64], layout: MeshLayout, settings: &OrientSettings) -> Result<Self> {
        if data.is_empty() {
            return Err(OrientError::EmptyMesh);
        }
        let stride = layout.stride();
        if data.len() % stride != 0 {
            return Err(OrientError::InvalidInput(format!(
                "{} values is not a multiple of {stride} per face",
                data.len()
            )));
        }
        if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
            return Err(OrientError::InvalidInput(format!(
                "non-finite value at index {pos}"
            )));
        }

        let input_faces = data.len() / stride;
        let mut faces: Vec<Face> = data
            .chunks_exact(stride)
            .filter_map(|chunk| face_from_chunk(chunk, layout))
            .collect();

        if faces.is_empty() {
            return Err(OrientError::DegenerateMesh(format!(
                "all {input_faces} faces have zero area"
            )));
        }

        let params = &settings.parameters;
        if params.negligible_face_size > 0.0 {
            let negligible = if settings.extended_mode {
                0.1 * params.negligible_face_size
            } else {
                params.negligible_face_size
            };
            let kept = faces.iter().filter(|f| f.area > negligible).count();
            if kept > MIN_FILTERED_FACES {
                faces.retain(|f| f.area > negligible);
            }
        }

        if let Some(side) = &settings.favored_side {
            let mut weighted = 0;
            for face in faces.iter_mut() {
                if side.aligns_with(&face.normal, params.angle_scale) {
                    face.area *= side.weight;
                    weighted += 1;
                }
            }
            tracing::debug!(side = %side, weighted, "Weighted favored side");
        }

        tracing::debug!(input_faces, faces = faces.len(), "Built face table");

        Ok(Self { faces, input_faces })
    }

    /// Surviving faces.
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Number of surviving faces.
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// Whether the table has no faces. Never true for a built table.
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Number of faces in the raw input.
    pub fn input_face_count(&self) -> usize {
        self.input_faces
    }

    /// Sum of all (weighted) face areas.
    pub fn total_area(&self) -> f64 {
        self.faces.iter().map(|f| f.area).sum()
    }
}

/// Decode one face, returning `None` for zero-area triangles.
fn face_from_chunk(chunk: &[f64], layout: MeshLayout) -> Option<Face> {
    let (given_normal, coords) = match layout {
        MeshLayout::Vertices => (None, chunk),
        MeshLayout::NormalsAndVertices => {
            (Some(Vec3::new(chunk[0], chunk[1], chunk[2])), &chunk[3..])
        }
    };

    let v0 = Point3::new(coords[0], coords[1], coords[2]);
    let v1 = Point3::new(coords[3], coords[4], coords[5]);
    let v2 = Point3::new(coords[6], coords[7], coords[8]);

    let cross = (v1 - v0).cross(&(v2 - v0));
    let magnitude = cross.norm();
    if magnitude <= 0.0 {
        return None;
    }

    let normal = match given_normal {
        Some(n) if n.norm() > 0.0 => n.normalize(),
        _ => cross / magnitude,
    };

    Some(Face {
        normal,
        vertices: [v0, v1, v2],
        area: magnitude / 2.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::FavoredSide;
    use approx::assert_relative_eq;

    #[test]
    fn test_cube_table() {
        let settings = OrientSettings::default();
        let table = MeshTable::from_vertices(&fixtures::cube(10.0), &settings).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.input_face_count(), 12);
        assert_relative_eq!(table.total_area(), 600.0, epsilon = 1e-9);
        for face in table.faces() {
            assert_relative_eq!(face.normal.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(face.area, 50.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normal_follows_winding() {
        let data = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let table = MeshTable::from_vertices(&data, &OrientSettings::default()).unwrap();
        assert_relative_eq!(table.faces()[0].normal, Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(table.faces()[0].area, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_supplied_normal_is_normalized() {
        let data = [
            0.0, 0.0, -3.0, // normal
            0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0,
        ];
        let table = MeshTable::from_facets(&data, &OrientSettings::default()).unwrap();
        let face = table.faces()[0];
        assert_relative_eq!(face.normal, -Vec3::z(), epsilon = 1e-12);
        // Area comes from the vertices, not from the supplied normal.
        assert_relative_eq!(face.area, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_supplied_normal_falls_back() {
        let data = [
            0.0, 0.0, 0.0, // normal
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0,
        ];
        let table = MeshTable::from_facets(&data, &OrientSettings::default()).unwrap();
        assert_relative_eq!(table.faces()[0].normal, Vec3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_faces_dropped() {
        let mut data = fixtures::cube(1.0);
        // collinear
        data.extend_from_slice(&[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        let table = MeshTable::from_vertices(&data, &OrientSettings::default()).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.input_face_count(), 13);
    }

    #[test]
    fn test_empty_mesh() {
        let err = MeshTable::from_vertices(&[], &OrientSettings::default()).unwrap_err();
        assert!(matches!(err, OrientError::EmptyMesh));
    }

    #[test]
    fn test_all_degenerate() {
        let data = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        let err = MeshTable::from_vertices(&data, &OrientSettings::default()).unwrap_err();
        assert!(matches!(err, OrientError::DegenerateMesh(_)));
    }

    #[test]
    fn test_bad_length() {
        let err = MeshTable::from_vertices(&[0.0; 10], &OrientSettings::default()).unwrap_err();
        assert!(matches!(err, OrientError::InvalidInput(_)));
        let err = MeshTable::from_facets(&[0.0; 9], &OrientSettings::default()).unwrap_err();
        assert!(matches!(err, OrientError::InvalidInput(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let data = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, f64::NAN, 0.0];
        let err = MeshTable::from_vertices(&data, &OrientSettings::default()).unwrap_err();
        assert!(matches!(err, OrientError::InvalidInput(_)));
    }

    #[test]
    fn test_small_faces_kept_on_low_poly_mesh() {
        // Every face is below the negligible size, but filtering would
        // leave nothing, so the table is kept whole.
        let settings = OrientSettings::default();
        let table = MeshTable::from_vertices(&fixtures::cube(0.5), &settings).unwrap();
        assert_eq!(table.len(), 12);
    }

    #[test]
    fn test_small_faces_filtered_on_dense_mesh() {
        let mut data = fixtures::grid_plate(12, 2.0);
        let large = data.len() / 9;
        data.extend(fixtures::grid_plate(4, 0.1));
        let table = MeshTable::from_vertices(&data, &OrientSettings::default()).unwrap();
        assert_eq!(table.len(), large);
    }

    #[test]
    fn test_extended_mode_keeps_smaller_faces() {
        let mut data = fixtures::grid_plate(12, 2.0);
        let large = data.len() / 9;
        // 0.125 mm² faces: below the regular threshold, above a tenth of it.
        data.extend(fixtures::grid_plate(4, 0.5));
        let settings = OrientSettings::default().with_extended_mode(true);
        let table = MeshTable::from_vertices(&data, &settings).unwrap();
        assert_eq!(table.len(), large + 32);
    }

    #[test]
    fn test_favored_side_weights_area() {
        let side = FavoredSide::new(-Vec3::z(), 3.0).unwrap();
        let settings = OrientSettings::default().with_favored_side(side);
        let table = MeshTable::from_vertices(&fixtures::cube(10.0), &settings).unwrap();
        let weighted: Vec<_> = table
            .faces()
            .iter()
            .filter(|f| (f.normal + Vec3::z()).norm() < 1e-9)
            .collect();
        assert_eq!(weighted.len(), 2);
        for face in weighted {
            assert_relative_eq!(face.area, 150.0, epsilon = 1e-9);
        }
        assert_relative_eq!(table.total_area(), 800.0, epsilon = 1e-9);
    }

    #[test]
    fn test_centroid() {
        let face = Face {
            normal: Vec3::z(),
            vertices: [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 3.0),
            ],
            area: 1.0,
        };
        assert_relative_eq!(face.centroid(), Point3::new(1.0, 1.0, 1.0), epsilon = 1e-12);
    }
}
