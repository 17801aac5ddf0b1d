//! Recording-type classification: maps a fingerprint to a mastering
//! philosophy using fixed, rule-based scoring rather than a learned model.
use auralis_dsp::AudioFingerprint;

const CONFIDENCE_THRESHOLD: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RecordingType {
    Studio,
    Bootleg,
    Metal,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StereoStrategy {
    Narrow,
    Maintain,
    Expand,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum MasteringPhilosophy {
    Enhance,
    Correct,
    Punch,
}

/// EQ deltas and dynamics/stereo guidance for a classified recording,
/// distinct from (and feeding into, via [`EqCurve::blended_with`]) the
/// content-driven generator of the processing-space module.
///
/// [`EqCurve::blended_with`]: auralis_dsp::eq::EqCurve::blended_with
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AdaptiveParameters {
    pub bass_adjustment_db: f64,
    pub mid_adjustment_db: f64,
    pub treble_adjustment_db: f64,
    pub stereo_width_target: f64,
    pub stereo_strategy: StereoStrategy,
    pub crest_factor_target_min: f64,
    pub crest_factor_target_max: f64,
    pub dr_expansion_db: f64,
    pub rms_adjustment_db: f64,
    pub peak_headroom_db: f64,
    pub mastering_philosophy: MasteringPhilosophy,
    pub confidence: f64,
}

/// Classifies a fingerprint into a [`RecordingType`] and generates the
/// matching [`AdaptiveParameters`], fine-tuned by how far the fingerprint
/// sits from that class's reference centroid.
pub fn detect(fp: &AudioFingerprint) -> (RecordingType, AdaptiveParameters) {
    let centroid_hz = fp.spectral_centroid;
    let bass_to_mid = fp.bass_mid_ratio;
    let stereo_width = fp.stereo_width;
    let crest_db = fp.crest_db;

    let studio_score = score_studio(centroid_hz, bass_to_mid, stereo_width, crest_db);
    let bootleg_score = score_bootleg(centroid_hz, bass_to_mid, stereo_width);
    let metal_score = score_metal(centroid_hz, bass_to_mid, stereo_width, crest_db);

    let (recording_type, confidence) = [
        (RecordingType::Studio, studio_score),
        (RecordingType::Bootleg, bootleg_score),
        (RecordingType::Metal, metal_score),
    ]
    .into_iter()
    .fold((RecordingType::Unknown, 0.0_f64), |best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    });

    if confidence < CONFIDENCE_THRESHOLD {
        return (RecordingType::Unknown, parameters_default(confidence));
    }

    let params = match recording_type {
        RecordingType::Studio => parameters_studio(fp, confidence),
        RecordingType::Bootleg => parameters_bootleg(fp, confidence),
        RecordingType::Metal => parameters_metal(fp, confidence),
        RecordingType::Unknown => parameters_default(confidence),
    };

    (recording_type, params)
}

fn score_studio(centroid_hz: f64, bass_to_mid: f64, stereo_width: f64, crest_db: f64) -> f64 {
    let mut score: f64 = 0.0;

    if (7500.0..=8000.0).contains(&centroid_hz) {
        score += 0.35;
        if (-2.0..=3.0).contains(&bass_to_mid) {
            score += 0.20;
        }
        if (0.08..=0.16).contains(&stereo_width) {
            score += 0.20;
        }
        if (10.0..=20.0).contains(&crest_db) {
            score += 0.10;
        }
    } else if centroid_hz > 600.0 && centroid_hz < 800.0 {
        score += 0.35;
        if bass_to_mid < 5.0 {
            score += 0.25;
        }
        if stereo_width > 0.30 && stereo_width < 0.50 {
            score += 0.15;
        }
    } else if centroid_hz > 500.0 && centroid_hz < 900.0 {
        score += 0.15;
        if bass_to_mid < 8.0 {
            score += 0.15;
        }
    }

    score.min(1.0)
}

fn score_bootleg(centroid_hz: f64, bass_to_mid: f64, stereo_width: f64) -> f64 {
    let mut score: f64 = 0.0;
    if centroid_hz < 500.0 {
        score += 0.4;
    } else if centroid_hz < 600.0 {
        score += 0.2;
    }
    if bass_to_mid > 12.0 {
        score += 0.4;
    } else if bass_to_mid > 10.0 {
        score += 0.2;
    }
    if stereo_width < 0.3 {
        score += 0.2;
    }
    score.min(1.0)
}

fn score_metal(centroid_hz: f64, bass_to_mid: f64, stereo_width: f64, crest_db: f64) -> f64 {
    let mut score: f64 = 0.0;
    if centroid_hz > 1000.0 {
        score += 0.4;
    } else if centroid_hz > 800.0 {
        score += 0.2;
    }
    if bass_to_mid > 8.0 && bass_to_mid < 11.0 {
        score += 0.2;
    }
    if stereo_width > 0.35 {
        score += 0.2;
    }
    if crest_db < 4.5 {
        score += 0.2;
    }
    score.min(1.0)
}

fn parameters_studio(fp: &AudioFingerprint, confidence: f64) -> AdaptiveParameters {
    let mut bass_adjustment_db = 1.5;
    let mut treble_adjustment_db = 2.0;
    if fp.spectral_centroid < 600.0 {
        bass_adjustment_db = 1.0;
    } else if fp.spectral_centroid > 800.0 {
        treble_adjustment_db = 1.5;
    }

    AdaptiveParameters {
        bass_adjustment_db,
        mid_adjustment_db: -1.0,
        treble_adjustment_db,
        stereo_width_target: 0.39,
        stereo_strategy: StereoStrategy::Maintain,
        crest_factor_target_min: 6.0,
        crest_factor_target_max: 6.5,
        dr_expansion_db: 0.0,
        rms_adjustment_db: -0.51,
        peak_headroom_db: -0.24,
        mastering_philosophy: MasteringPhilosophy::Enhance,
        confidence,
    }
}

fn parameters_bootleg(fp: &AudioFingerprint, confidence: f64) -> AdaptiveParameters {
    let mut bass_adjustment_db = -4.0;
    let mut treble_adjustment_db = 4.0;
    if fp.spectral_centroid < 450.0 {
        treble_adjustment_db = 4.5;
    }
    if fp.bass_mid_ratio > 15.0 {
        bass_adjustment_db = -4.5;
    }

    AdaptiveParameters {
        bass_adjustment_db,
        mid_adjustment_db: -3.5,
        treble_adjustment_db,
        stereo_width_target: 0.40,
        stereo_strategy: StereoStrategy::Expand,
        crest_factor_target_min: 4.6,
        crest_factor_target_max: 6.0,
        dr_expansion_db: 23.5,
        rms_adjustment_db: 2.0,
        peak_headroom_db: -0.02,
        mastering_philosophy: MasteringPhilosophy::Correct,
        confidence,
    }
}

fn parameters_metal(fp: &AudioFingerprint, confidence: f64) -> AdaptiveParameters {
    let mut treble_adjustment_db = -1.22;
    if fp.spectral_centroid > 1340.0 {
        treble_adjustment_db = -1.5;
    } else if fp.spectral_centroid < 1200.0 {
        treble_adjustment_db = -0.95;
    }
    let mid_adjustment_db = if fp.crest_db < 3.5 { -5.5 } else { -5.70 };

    AdaptiveParameters {
        bass_adjustment_db: 3.85,
        mid_adjustment_db,
        treble_adjustment_db,
        stereo_width_target: 0.263,
        stereo_strategy: StereoStrategy::Narrow,
        crest_factor_target_min: 5.0,
        crest_factor_target_max: 5.3,
        dr_expansion_db: 23.2,
        rms_adjustment_db: -3.93,
        peak_headroom_db: -0.40,
        mastering_philosophy: MasteringPhilosophy::Punch,
        confidence,
    }
}

fn parameters_default(confidence: f64) -> AdaptiveParameters {
    AdaptiveParameters {
        bass_adjustment_db: 1.8,
        mid_adjustment_db: 0.0,
        treble_adjustment_db: 1.0,
        stereo_width_target: 0.4,
        stereo_strategy: StereoStrategy::Maintain,
        crest_factor_target_min: 5.5,
        crest_factor_target_max: 6.5,
        dr_expansion_db: 2.0,
        rms_adjustment_db: 0.0,
        peak_headroom_db: -0.2,
        mastering_philosophy: MasteringPhilosophy::Enhance,
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp_with(centroid: f64, bass_mid: f64, stereo: f64, crest: f64) -> AudioFingerprint {
        let mut fp = AudioFingerprint::neutral();
        fp.spectral_centroid = centroid;
        fp.bass_mid_ratio = bass_mid;
        fp.stereo_width = stereo;
        fp.crest_db = crest;
        fp
    }

    #[test]
    fn hd_bright_studio_profile_classifies_as_studio() {
        let fp = fp_with(7700.0, 1.0, 0.12, 15.0);
        let (kind, params) = detect(&fp);
        assert_eq!(kind, RecordingType::Studio);
        assert_eq!(params.mastering_philosophy, MasteringPhilosophy::Enhance);
    }

    #[test]
    fn dark_bass_heavy_narrow_classifies_as_bootleg() {
        let fp = fp_with(400.0, 16.0, 0.15, 6.0);
        let (kind, params) = detect(&fp);
        assert_eq!(kind, RecordingType::Bootleg);
        assert_eq!(params.stereo_strategy, StereoStrategy::Expand);
    }

    #[test]
    fn bright_compressed_wide_classifies_as_metal() {
        let fp = fp_with(1400.0, 9.0, 0.45, 3.0);
        let (kind, _) = detect(&fp);
        assert_eq!(kind, RecordingType::Metal);
    }

    #[test]
    fn ambiguous_fingerprint_falls_back_to_unknown() {
        let fp = fp_with(2000.0, 5.0, 0.5, 10.0);
        let (kind, params) = detect(&fp);
        assert_eq!(kind, RecordingType::Unknown);
        assert_eq!(params.mastering_philosophy, MasteringPhilosophy::Enhance);
    }

    #[test]
    fn unknown_has_conservative_confidence_below_threshold() {
        let fp = fp_with(2000.0, 5.0, 0.5, 10.0);
        let (_, params) = detect(&fp);
        assert!(params.confidence < CONFIDENCE_THRESHOLD);
    }
}
