#![warn(missing_docs)]

//! Automatic print orientation for the vcad slicer.
//!
//! Given a triangle mesh, this crate searches for the rotation that
//! minimizes its *unprintability*: a heuristic that rises with unsupported
//! overhang and falls with the area and contour length resting on the bed.
//! It does not slice or generate supports; it ranks a finite set of
//! candidate orientations.
//!
//! The pipeline:
//! 1. Build a per-face table ([`MeshTable`]).
//! 2. Propose candidate directions ([`candidates`]).
//! 3. Drop near-duplicates (extended mode).
//! 4. Score every candidate ([`score`], [`Parameters::unprintability`]).
//! 5. Encode the winner as a [`Rotation`].
//!
//! # Example
//!
//! ```
//! use vcad_orient::{orient, MeshLayout, OrientSettings};
//!
//! // A single triangle lying face-down on the bed.
//! let data = [0.0, 0.0, 0.0, 0.0, 20.0, 0.0, 20.0, 0.0, 0.0];
//! let result = orient(&data, MeshLayout::Vertices, &OrientSettings::default())?;
//!
//! assert!(result.rotation.is_identity());
//! assert!(!result.needs_support());
//! # Ok::<(), vcad_orient::OrientError>(())
//! ```

pub mod candidates;
pub mod error;
pub mod favor;
pub mod mesh;
pub mod objective;
pub mod rotation;
pub mod score;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod proptests;

pub use candidates::{Candidate, CandidateSource};
pub use error::{OrientError, Result};
pub use favor::FavoredSide;
pub use mesh::{Face, MeshLayout, MeshTable};
pub use objective::{Parameters, DEFAULT_CRITICAL_ANGLE, SUPPORT_THRESHOLD};
pub use rotation::Rotation;
pub use score::{score_orientation, OverhangScore, ProjectionBuffer};

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = nalgebra::Vector3<f64>;

/// Candidates taken from area cumulation.
pub const AREA_CUMULATION_CANDIDATES: usize = 10;

/// Candidates taken from random sampling (before adding antiparallels).
pub const DEATH_STAR_CANDIDATES: usize = 12;

/// Orientation search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrientSettings {
    /// Enable random sampling, supplemental directions, duplicate removal,
    /// exact contour edges and the flat-ceiling credit.
    pub extended_mode: bool,
    /// Weight overhangs by their height (support volume) instead of area.
    pub min_volume: bool,
    /// Angle between face normal and build direction beyond which a face
    /// overhangs (degrees).
    pub critical_angle: f64,
    /// Side to favor (or penalize) before candidate generation.
    pub favored_side: Option<FavoredSide>,
    /// Seed for random sampling. `None` draws from system entropy.
    pub seed: Option<u64>,
    /// Tuning constants.
    pub parameters: Parameters,
}

impl Default for OrientSettings {
    fn default() -> Self {
        Self {
            extended_mode: false,
            min_volume: false,
            critical_angle: DEFAULT_CRITICAL_ANGLE,
            favored_side: None,
            seed: None,
            parameters: Parameters::default(),
        }
    }
}

impl OrientSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !self.critical_angle.is_finite()
            || self.critical_angle <= 0.0
            || self.critical_angle > 180.0
        {
            return Err(OrientError::InvalidSettings(
                "critical_angle must be between 0 and 180 degrees".into(),
            ));
        }
        let p = &self.parameters;
        if !(p.first_layer_height.is_finite() && p.first_layer_height > 0.0) {
            return Err(OrientError::InvalidSettings(
                "first_layer_height must be positive".into(),
            ));
        }
        if !(p.absolute_factor.is_finite() && p.absolute_factor > 0.0) {
            return Err(OrientError::InvalidSettings(
                "absolute_factor must be positive".into(),
            ));
        }
        if !(p.tar_d.is_finite() && p.tar_d > 0.0) {
            return Err(OrientError::InvalidSettings("tar_d must be positive".into()));
        }
        // With tar_d > 0 these keep the relative term's denominator positive.
        for (name, value) in [
            ("relative_factor", p.relative_factor),
            ("contour_factor", p.contour_factor),
            ("bottom_factor", p.bottom_factor),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(OrientError::InvalidSettings(format!(
                    "{name} must not be negative"
                )));
            }
        }
        if p.negligible_face_size < 0.0 || p.contour_amount < 0.0 {
            return Err(OrientError::InvalidSettings(
                "negligible_face_size and contour_amount must not be negative".into(),
            ));
        }
        if let Some(side) = &self.favored_side {
            // Re-run the constructor checks for deserialized values.
            FavoredSide::new(side.direction, side.weight)?;
        }
        Ok(())
    }

    /// Set extended mode.
    pub fn with_extended_mode(mut self, extended: bool) -> Self {
        self.extended_mode = extended;
        self
    }

    /// Set min-volume scoring.
    pub fn with_min_volume(mut self, min_volume: bool) -> Self {
        self.min_volume = min_volume;
        self
    }

    /// Set the critical overhang angle (degrees).
    pub fn with_critical_angle(mut self, angle: f64) -> Self {
        self.critical_angle = angle;
        self
    }

    /// Favor a side.
    pub fn with_favored_side(mut self, side: FavoredSide) -> Self {
        self.favored_side = Some(side);
        self
    }

    /// Seed the random sampler.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the tuning constants.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// One evaluated build direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredOrientation {
    /// Up vector of the print (the negated down direction).
    pub alignment: Vec3,
    /// Generator that proposed this direction.
    pub source: CandidateSource,
    /// Area resting on the bed.
    pub bottom: f64,
    /// Overhang penalty.
    pub overhang: f64,
    /// Bottom contour length.
    pub contour: f64,
    /// Combined score; lower is better.
    pub unprintability: f64,
}

impl ScoredOrientation {
    /// Direction pointing down onto the bed.
    pub fn down(&self) -> Vec3 {
        -self.alignment
    }

    /// Rotation bringing the mesh into this orientation.
    pub fn rotation(&self) -> Rotation {
        Rotation::from_alignment(&self.alignment)
    }
}

/// Outcome of an orientation search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrientResult {
    /// Winning orientation.
    pub best: ScoredOrientation,
    /// Rotation for the winning orientation.
    pub rotation: Rotation,
    /// Every evaluated orientation, best first.
    pub ranked: Vec<ScoredOrientation>,
    /// Faces in the scored table.
    pub face_count: usize,
    /// Time spent in each stage.
    pub timings: StageTimings,
}

/// Wall-clock time spent in each search stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTimings {
    /// Building the face table.
    pub preprocessing: Duration,
    /// Grouping face normals by area.
    pub area_cumulation: Duration,
    /// Random sampling. Zero outside extended mode.
    pub death_star: Duration,
    /// Scoring every candidate.
    pub scoring: Duration,
}

impl StageTimings {
    /// Sum of all stages.
    pub fn total(&self) -> Duration {
        self.preprocessing + self.area_cumulation + self.death_star + self.scoring
    }
}

impl OrientResult {
    /// Whether support structures are recommended even in the best
    /// orientation.
    pub fn needs_support(&self) -> bool {
        self.best.unprintability > SUPPORT_THRESHOLD
    }
}

/// Stage of the search state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStage {
    /// Building the face table.
    Preprocessing,
    /// Running the candidate generators.
    GeneratingCandidates,
    /// Removing near-duplicate candidates.
    Deduplicating,
    /// Scoring candidates.
    Scoring,
    /// Ranking scores.
    Selecting,
    /// Encoding the winning rotation.
    EncodingRotation,
    /// Search finished.
    Done,
}

/// Progress report passed to a search observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current stage.
    pub stage: SearchStage,
    /// Candidates scored so far.
    pub evaluated: usize,
    /// Candidates to score (0 until known).
    pub total: usize,
}

/// Orientation search over one mesh.
///
/// Holds the face table for the lifetime of the search. The table is never
/// modified by scoring, so candidates are scored in parallel.
#[derive(Debug, Clone)]
pub struct Orienter {
    table: MeshTable,
    settings: OrientSettings,
    preprocessing: Duration,
}

impl Orienter {
    /// Validate `settings` and build the face table.
    pub fn new(data: &[f64], layout: MeshLayout, settings: OrientSettings) -> Result<Self> {
        settings.validate()?;
        let start = Instant::now();
        let table = MeshTable::build(data, layout, &settings)?;
        let preprocessing = start.elapsed();
        tracing::debug!(
            faces = table.len(),
            elapsed_ms = preprocessing.as_millis() as u64,
            "Preprocessing complete"
        );
        Ok(Self {
            table,
            settings,
            preprocessing,
        })
    }

    /// The face table.
    pub fn table(&self) -> &MeshTable {
        &self.table
    }

    /// The settings in use.
    pub fn settings(&self) -> &OrientSettings {
        &self.settings
    }

    /// Raw generator output: the unrotated direction first, then area
    /// cumulation, then (extended mode) sampling and supplements.
    pub fn generate_candidates(&self) -> Vec<Candidate> {
        self.generate_timed(&mut StageTimings::default())
    }

    fn generate_timed(&self, timings: &mut StageTimings) -> Vec<Candidate> {
        let mut candidates = vec![Candidate::unrotated()];

        let start = Instant::now();
        candidates.extend(candidates::area_cumulation(
            &self.table,
            AREA_CUMULATION_CANDIDATES,
        ));
        timings.area_cumulation = start.elapsed();
        tracing::debug!(
            candidates = candidates.len() - 1,
            elapsed_ms = timings.area_cumulation.as_millis() as u64,
            "Area cumulation complete"
        );

        if self.settings.extended_mode {
            let start = Instant::now();
            let mut rng = match self.settings.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let sampled = candidates::death_star(&self.table, DEATH_STAR_CANDIDATES, &mut rng);
            timings.death_star = start.elapsed();
            tracing::debug!(
                candidates = sampled.len(),
                iterations = candidates::death_star_iterations(self.table.len()),
                elapsed_ms = timings.death_star.as_millis() as u64,
                "Death star sampling complete"
            );
            candidates.extend(sampled);
            candidates.extend(candidates::supplements());
        }

        candidates
    }

    /// Candidates to score: generator output, deduplicated in extended mode.
    pub fn candidates(&self) -> Vec<Candidate> {
        self.candidates_timed(&mut StageTimings::default())
    }

    fn candidates_timed(&self, timings: &mut StageTimings) -> Vec<Candidate> {
        let candidates = self.generate_timed(timings);
        if self.settings.extended_mode {
            self.deduplicate(candidates)
        } else {
            candidates
        }
    }

    fn stage_timings(&self) -> StageTimings {
        StageTimings {
            preprocessing: self.preprocessing,
            ..StageTimings::default()
        }
    }

    fn deduplicate(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let tolerance = candidates::duplicate_tolerance(candidates::DUPLICATE_ANGLE_DEG);
        candidates::remove_duplicates(candidates, tolerance)
    }

    /// Score one candidate, using `buffer` for the projections.
    pub fn score(&self, candidate: &Candidate, buffer: &mut ProjectionBuffer) -> ScoredOrientation {
        let alignment = candidate.alignment();
        let metrics = score_orientation(&self.table, buffer, &alignment, &self.settings);
        let params = &self.settings.parameters;

        let mut unprintability = params.unprintability(
            metrics.bottom,
            metrics.overhang,
            metrics.contour,
            self.settings.min_volume,
        );
        if candidate.source == CandidateSource::Default {
            unprintability -= params.default_orientation_bonus;
        }

        tracing::debug!(
            alignment = ?alignment.as_slice(),
            source = ?candidate.source,
            bottom = metrics.bottom,
            overhang = metrics.overhang,
            contour = metrics.contour,
            unprintability,
            "Scored orientation"
        );

        ScoredOrientation {
            alignment,
            source: candidate.source,
            bottom: metrics.bottom,
            overhang: metrics.overhang,
            contour: metrics.contour,
            unprintability,
        }
    }

    /// Run the search, scoring candidates in parallel.
    pub fn search(&self) -> Result<OrientResult> {
        let mut timings = self.stage_timings();
        let candidates = self.candidates_timed(&mut timings);
        tracing::info!(
            faces = self.table.len(),
            candidates = candidates.len(),
            "Starting orientation search"
        );

        let start = Instant::now();
        let scored: Vec<ScoredOrientation> = candidates
            .par_iter()
            .map_init(ProjectionBuffer::new, |buffer, candidate| {
                self.score(candidate, buffer)
            })
            .collect();
        timings.scoring = start.elapsed();

        let result = self.select(scored, timings)?;
        log_result(&result);
        Ok(result)
    }

    /// Run the search sequentially, reporting each stage and each scored
    /// candidate to `observer`. Returning [`ControlFlow::Break`] aborts with
    /// [`OrientError::Cancelled`].
    pub fn search_with_progress<F>(&self, mut observer: F) -> Result<OrientResult>
    where
        F: FnMut(&Progress) -> ControlFlow<()>,
    {
        let mut timings = self.stage_timings();
        let mut report = |stage, evaluated, total| match observer(&Progress {
            stage,
            evaluated,
            total,
        }) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(OrientError::Cancelled),
        };

        report(SearchStage::GeneratingCandidates, 0, 0)?;
        let mut candidates = self.generate_timed(&mut timings);
        if self.settings.extended_mode {
            report(SearchStage::Deduplicating, 0, 0)?;
            candidates = self.deduplicate(candidates);
        }
        tracing::info!(
            faces = self.table.len(),
            candidates = candidates.len(),
            "Starting orientation search"
        );

        let total = candidates.len();
        let start = Instant::now();
        let mut buffer = ProjectionBuffer::new();
        let mut scored = Vec::with_capacity(total);
        for (i, candidate) in candidates.iter().enumerate() {
            report(SearchStage::Scoring, i, total)?;
            scored.push(self.score(candidate, &mut buffer));
        }
        timings.scoring = start.elapsed();

        report(SearchStage::Selecting, total, total)?;
        let mut ranked = scored;
        sort_ranked(&mut ranked);

        report(SearchStage::EncodingRotation, total, total)?;
        let result = self.encode(ranked, timings)?;

        report(SearchStage::Done, total, total)?;
        log_result(&result);
        Ok(result)
    }

    fn select(
        &self,
        mut ranked: Vec<ScoredOrientation>,
        timings: StageTimings,
    ) -> Result<OrientResult> {
        sort_ranked(&mut ranked);
        self.encode(ranked, timings)
    }

    fn encode(
        &self,
        ranked: Vec<ScoredOrientation>,
        timings: StageTimings,
    ) -> Result<OrientResult> {
        let best = ranked
            .first()
            .copied()
            .ok_or_else(|| OrientError::DegenerateMesh("no orientation could be scored".into()))?;
        Ok(OrientResult {
            best,
            rotation: best.rotation(),
            ranked,
            face_count: self.table.len(),
            timings,
        })
    }
}

/// Stable ascending sort, so ties keep generation order.
fn sort_ranked(ranked: &mut [ScoredOrientation]) {
    ranked.sort_by(|a, b| a.unprintability.total_cmp(&b.unprintability));
}

fn log_result(result: &OrientResult) {
    let t = &result.timings;
    tracing::info!(
        alignment = ?result.best.alignment.as_slice(),
        unprintability = result.best.unprintability,
        needs_support = result.needs_support(),
        preprocessing_ms = t.preprocessing.as_millis() as u64,
        area_cumulation_ms = t.area_cumulation.as_millis() as u64,
        death_star_ms = t.death_star.as_millis() as u64,
        scoring_ms = t.scoring.as_millis() as u64,
        elapsed_ms = t.total().as_millis() as u64,
        "Orientation search complete"
    );
}

/// Find the best print orientation for flat triangle data.
///
/// This is the main entry point. It:
/// 1. Builds the face table
/// 2. Generates (and in extended mode deduplicates) candidates
/// 3. Scores them in parallel
/// 4. Ranks them and encodes the winner's rotation
pub fn orient(data: &[f64], layout: MeshLayout, settings: &OrientSettings) -> Result<OrientResult> {
    Orienter::new(data, layout, settings.clone())?.search()
}

/// Like [`orient`], scoring sequentially and reporting progress to
/// `observer`, which may cancel the search.
pub fn orient_with_progress<F>(
    data: &[f64],
    layout: MeshLayout,
    settings: &OrientSettings,
    mut observer: F,
) -> Result<OrientResult>
where
    F: FnMut(&Progress) -> ControlFlow<()>,
{
    let preprocessing = Progress {
        stage: SearchStage::Preprocessing,
        evaluated: 0,
        total: 0,
    };
    if observer(&preprocessing).is_break() {
        return Err(OrientError::Cancelled);
    }
    Orienter::new(data, layout, settings.clone())?.search_with_progress(observer)
}
