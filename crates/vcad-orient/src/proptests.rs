//! Property tests over random triangle soups and directions.

use proptest::prelude::*;

use crate::candidates::{
    duplicate_tolerance, remove_duplicates, Candidate, CandidateSource, DUPLICATE_ANGLE_DEG,
};
use crate::{score_orientation, MeshTable, OrientSettings, ProjectionBuffer, Rotation, Vec3};

/// Flat triangle data with 1..40 faces and coordinates in [-50, 50].
fn soup_strategy() -> impl Strategy<Value = Vec<f64>> {
    (1usize..40).prop_flat_map(|faces| prop::collection::vec(-50.0f64..50.0, faces * 9))
}

/// Unit vector, rejecting near-zero samples.
fn direction_strategy() -> impl Strategy<Value = Vec3> {
    (-1.0f64..1.0, -1.0f64..1.0, -1.0f64..1.0)
        .prop_map(|(x, y, z)| Vec3::new(x, y, z))
        .prop_filter("direction must have length", |v| v.norm() > 1e-3)
        .prop_map(|v| v.normalize())
}

fn settings_strategy() -> impl Strategy<Value = OrientSettings> {
    (any::<bool>(), any::<bool>()).prop_map(|(extended, min_volume)| {
        OrientSettings::default()
            .with_extended_mode(extended)
            .with_min_volume(min_volume)
    })
}

proptest! {
    #[test]
    fn normals_are_unit(data in soup_strategy()) {
        let Ok(table) = MeshTable::from_vertices(&data, &OrientSettings::default()) else {
            return Ok(());
        };
        for face in table.faces() {
            prop_assert!((face.normal.norm() - 1.0).abs() < 1e-9);
            prop_assert!(face.area > 0.0);
        }
    }

    #[test]
    fn metrics_are_non_negative(
        data in soup_strategy(),
        alignment in direction_strategy(),
        settings in settings_strategy(),
    ) {
        let Ok(table) = MeshTable::from_vertices(&data, &settings) else {
            return Ok(());
        };
        let mut buffer = ProjectionBuffer::new();
        let score = score_orientation(&table, &mut buffer, &alignment, &settings);
        prop_assert!(score.bottom >= 0.0);
        prop_assert!(score.overhang >= 0.0);
        prop_assert!(score.contour >= 0.0);
    }

    #[test]
    fn scoring_is_idempotent(
        data in soup_strategy(),
        first in direction_strategy(),
        other in direction_strategy(),
        settings in settings_strategy(),
    ) {
        let Ok(table) = MeshTable::from_vertices(&data, &settings) else {
            return Ok(());
        };
        let mut buffer = ProjectionBuffer::new();
        let a = score_orientation(&table, &mut buffer, &first, &settings);
        score_orientation(&table, &mut buffer, &other, &settings);
        let b = score_orientation(&table, &mut buffer, &first, &settings);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn deduplicated_candidates_are_separated(
        directions in prop::collection::vec(direction_strategy(), 0..60),
    ) {
        let tolerance = duplicate_tolerance(DUPLICATE_ANGLE_DEG);
        let candidates: Vec<Candidate> = directions
            .iter()
            .map(|&direction| Candidate {
                direction,
                weight: 0.0,
                source: CandidateSource::Supplement,
            })
            .collect();
        let kept = remove_duplicates(candidates, tolerance);
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                prop_assert!((a.direction - b.direction).norm() >= tolerance);
            }
        }
        // Every dropped direction is close to a kept one.
        for d in &directions {
            prop_assert!(kept.iter().any(|k| (k.direction - d).norm() < tolerance + 1e-12));
        }
    }

    #[test]
    fn rotation_maps_up_onto_alignment(alignment in direction_strategy()) {
        let r = Rotation::from_alignment(&alignment);
        // Near the poles the encoder snaps to the exact axis.
        let tolerance = if alignment.z.abs() > 0.999 { 2e-3 } else { 1e-5 };
        prop_assert!((r.matrix * Vec3::z() - alignment).norm() < tolerance);
        prop_assert!((r.apply_vec(&alignment) - Vec3::z()).norm() < tolerance);
    }
}
