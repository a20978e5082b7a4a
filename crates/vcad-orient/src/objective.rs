//! Unprintability objective and its tuning constants.

use serde::{Deserialize, Serialize};

/// Unprintability above which support structures are recommended.
pub const SUPPORT_THRESHOLD: f64 = 10.0;

/// Overhang divisor applied in min-volume mode. A volume is one dimension
/// higher than an area, so its magnitude is scaled down to stay comparable.
pub const VOLUME_DIVISOR: f64 = 25.0;

/// Default angle between face normal and build direction beyond which a
/// face overhangs (degrees).
pub const DEFAULT_CRITICAL_ANGLE: f64 = 119.038_124_333_021_57;

/// Tunable constants of the scoring pipeline.
///
/// The defaults were fitted by an evolutionary search over a corpus of real
/// print jobs. They are parameters, not structure: the objective keeps its
/// qualitative shape for any positive values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Divisor of the absolute overhang term.
    pub absolute_factor: f64,
    /// Weight of the relative overhang / support-footprint term.
    pub relative_factor: f64,
    /// Weight of the bottom contour length.
    pub contour_factor: f64,
    /// Height band above the lowest point that still counts as the bed (mm).
    pub first_layer_height: f64,
    /// Weight of the absolute overhang term.
    pub tar_a: f64,
    /// Offset added to the overhang in the absolute term.
    pub tar_b: f64,
    /// Offset added to the overhang in the relative term.
    pub tar_c: f64,
    /// Offset of the relative term's denominator.
    pub tar_d: f64,
    /// Weight of the bottom area.
    pub bottom_factor: f64,
    /// Fraction of a flat ceiling's area credited back to the overhang.
    pub plafond_advantage: f64,
    /// Squared chordal distance below which a face counts as aligned with
    /// the favored side.
    pub angle_scale: f64,
    /// Faces smaller than this are dropped from the table (mm²).
    pub negligible_face_size: f64,
    /// Constant penalty per contour edge.
    pub contour_amount: f64,
    /// Subtracted from the unmoved orientation's score to break ties in
    /// favor of not rotating.
    pub default_orientation_bonus: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            absolute_factor: 98.588_376_843_482_2,
            relative_factor: 1.162_524_130_132_582,
            contour_factor: 0.160_562_869_807_431_7,
            first_layer_height: 0.084_732_087_666_492_07,
            tar_a: 0.701_586_018_295_073_9,
            tar_b: 0.269_315_821_200_581_84,
            tar_c: 1.554_247_674_370_683,
            tar_d: 0.448_339_526_356_295_37,
            bottom_factor: 0.884_061_310_738_371_7,
            plafond_advantage: 0.241_743_136_219_492_37,
            angle_scale: 0.725_442_135_843_562_9,
            negligible_face_size: 0.438_595_129_085_275_54,
            contour_amount: 0.012_893_512_521_961_371,
            default_orientation_bonus: 1e-6,
        }
    }
}

impl Parameters {
    /// Combine bottom area, overhang and contour length into one score.
    ///
    /// Smaller is better. Larger overhang raises the score; larger bottom
    /// area or contour length lowers it. With `min_volume` the overhang is a
    /// height-weighted volume and is scaled by [`VOLUME_DIVISOR`] first.
    pub fn unprintability(
        &self,
        bottom: f64,
        overhang: f64,
        contour: f64,
        min_volume: bool,
    ) -> f64 {
        let overhang = if min_volume {
            overhang / VOLUME_DIVISOR
        } else {
            overhang
        };

        self.tar_a * ((overhang + self.tar_b) / self.absolute_factor)
            + self.relative_factor * (overhang + self.tar_c)
                / (self.tar_d + self.contour_factor * contour + self.bottom_factor * bottom)
    }
}
