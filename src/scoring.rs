//! Combined quality score from technical metrics and the aesthetic score.

/// Per-photo inputs for the quality score. Missing fields count as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityInputs {
    pub sharpness: Option<f64>,
    pub contrast: Option<f64>,
    pub exposure_clip_hi: Option<f64>,
    pub aesthetic_score: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub technical: f64,
    pub aesthetic: f64,
}

/// Sharpness is a raw Laplacian variance (hundreds to thousands for sharp
/// images); the 0.001 factor brings it into the same range as contrast and
/// the highlight-clip fraction before clamping.
const SHARPNESS_SCALE: f64 = 0.001;

/// Pure scalar quality score. Deterministic for identical inputs; the
/// weights are configuration and are not required to sum to 1.
pub fn quality_score(inputs: &QualityInputs, weights: &ScoreWeights) -> f64 {
    let sharpness = inputs.sharpness.unwrap_or(0.0);
    let contrast = inputs.contrast.unwrap_or(0.0);
    let clip_hi = inputs.exposure_clip_hi.unwrap_or(0.0);
    let aesthetic = inputs.aesthetic_score.unwrap_or(0.0);

    let tech = (sharpness * SHARPNESS_SCALE + contrast - clip_hi).clamp(0.0, 1.0);
    weights.technical * tech + weights.aesthetic * aesthetic
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEIGHTS: ScoreWeights = ScoreWeights {
        technical: 0.4,
        aesthetic: 0.6,
    };

    #[test]
    fn missing_fields_default_to_zero() {
        let score = quality_score(&QualityInputs::default(), &WEIGHTS);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn combines_technical_and_aesthetic() {
        let inputs = QualityInputs {
            sharpness: Some(500.0),
            contrast: Some(0.3),
            exposure_clip_hi: Some(0.1),
            aesthetic_score: Some(0.5),
        };
        // tech = clamp(0.5 + 0.3 - 0.1) = 0.7
        let score = quality_score(&inputs, &WEIGHTS);
        assert!((score - (0.4 * 0.7 + 0.6 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn technical_term_is_clamped() {
        let inputs = QualityInputs {
            sharpness: Some(10_000.0),
            contrast: Some(1.0),
            exposure_clip_hi: Some(0.0),
            aesthetic_score: Some(0.0),
        };
        assert_eq!(quality_score(&inputs, &WEIGHTS), 0.4);

        let inputs = QualityInputs {
            sharpness: Some(0.0),
            contrast: Some(0.0),
            exposure_clip_hi: Some(0.9),
            aesthetic_score: Some(1.0),
        };
        assert_eq!(quality_score(&inputs, &WEIGHTS), 0.6);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let inputs = QualityInputs {
            sharpness: Some(321.5),
            contrast: Some(0.21),
            exposure_clip_hi: Some(0.03),
            aesthetic_score: Some(0.77),
        };
        assert_eq!(
            quality_score(&inputs, &WEIGHTS),
            quality_score(&inputs, &WEIGHTS)
        );
    }
}
