// Reduction configuration.
//
// Every knob of a multi-part reduction lives in `ReductionConfig`, loaded
// from JSON. Missing fields take their defaults, so `{}` is a valid config
// and `{"max_chords": 1}` changes one thing. The defaults are the
// multi-part pipeline's: two chords per measure, consonance-boosted
// weighting, trim at 0.3, syncopation smoothing on, every optional pass off.
//
// A config is validated when loaded and again when a reducer is built from
// it, so a hand-constructed config gets the same checks as a loaded one.

use crate::error::{HarmonyError, Result};
use crate::reducer::{ChordReducer, check_limits};
use crate::weighting::WeightAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReductionConfig {
    /// Upper bound on distinct chords kept per measure.
    pub max_chords: usize,
    pub weight_algorithm: WeightAlgorithm,
    /// Drop kept chords lighter than this fraction of the heaviest (0..=1).
    pub trim_below: f64,
    /// Move lyric-sharing elements onto the strongest beat before chordifying.
    pub align_lyrics: bool,
    /// Fold tied arpeggio groups into block chords after chordifying.
    pub collapse_arpeggios: bool,
    /// Respell output chords in closed position.
    pub closed_position: bool,
    /// With `closed_position`, move the bass into this octave (4 = middle C).
    pub force_octave: Option<i8>,
    pub smooth_syncopation: bool,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        ReductionConfig {
            max_chords: 2,
            weight_algorithm: WeightAlgorithm::ConsonanceBoosted,
            trim_below: 0.3,
            align_lyrics: false,
            collapse_arpeggios: false,
            closed_position: false,
            force_octave: None,
            smooth_syncopation: true,
        }
    }
}

impl ReductionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|source| HarmonyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let config: ReductionConfig = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_limits(self.max_chords, self.trim_below)
    }

    /// A reducer with this config's chord count, threshold, and weigher.
    pub fn reducer(&self) -> Result<ChordReducer> {
        self.validate()?;
        Ok(
            ChordReducer::new(self.max_chords, self.trim_below, self.weight_algorithm)?
                .with_syncopation_smoothing(self.smooth_syncopation),
        )
    }
}
