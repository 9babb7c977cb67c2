// Meter: time signatures and metrical weight.
//
// Metrical weight ("beat strength") measures how prominent an offset is
// within its bar. The downbeat is 1.0; each level of subdivision halves
// the weight. In 4/4 the quarters weigh 1.0, 0.25, 0.5, 0.25 and the
// off-beat eighths 0.125. Compound meters (6/8, 9/8, 12/8) group their
// pulses in threes first, so 6/8 weighs 1.0 on beat one, 0.5 on beat two,
// and 0.25 on the other eighths.
//
// The reducer never computes weights itself; it reads `Event::metrical_weight`.
// Callers that do not get weights from their parser can fill them in with
// `assign_metrical_weights`.

use crate::error::HarmonyError;
use crate::event::{Event, approx_eq};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of halvings below the beat level before every offset counts as
/// "weakest".
const SUBDIVISION_DEPTH: usize = 4;

/// Both fields are at least 1; deserializing a zero is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSignature")]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

#[derive(Deserialize)]
struct RawTimeSignature {
    numerator: u8,
    denominator: u8,
}

impl TryFrom<RawTimeSignature> for TimeSignature {
    type Error = HarmonyError;

    fn try_from(raw: RawTimeSignature) -> Result<Self, Self::Error> {
        if raw.numerator == 0 || raw.denominator == 0 {
            return Err(HarmonyError::InvalidTimeSignature {
                numerator: raw.numerator,
                denominator: raw.denominator,
            });
        }
        Ok(TimeSignature {
            numerator: raw.numerator,
            denominator: raw.denominator,
        })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::new(4, 4)
    }
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Self {
        TimeSignature {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Length of one notated beat unit in quarter lengths (1.0 for x/4).
    pub fn beat_unit(&self) -> f64 {
        4.0 / self.denominator as f64
    }

    /// Length of a full bar in quarter lengths.
    pub fn bar_duration(&self) -> f64 {
        self.numerator as f64 * self.beat_unit()
    }

    pub fn is_compound(&self) -> bool {
        self.numerator > 3 && self.numerator % 3 == 0
    }

    /// Division lengths from coarsest to finest, excluding the bar itself.
    fn levels(&self) -> Vec<f64> {
        let unit = self.beat_unit();
        let mut levels = Vec::new();
        if self.is_compound() {
            if self.numerator == 12 {
                levels.push(6.0 * unit);
            }
            levels.push(3.0 * unit);
        } else if self.numerator == 4 {
            levels.push(2.0 * unit);
        }
        levels.push(unit);
        for _ in 0..SUBDIVISION_DEPTH {
            let finest = levels[levels.len() - 1];
            levels.push(finest / 2.0);
        }
        levels
    }

    /// Metrical weight of an offset measured from the start of the bar.
    pub fn beat_strength(&self, offset_in_bar: f64) -> f64 {
        let offset = offset_in_bar.rem_euclid(self.bar_duration());
        if approx_eq(offset, 0.0) || approx_eq(offset, self.bar_duration()) {
            return 1.0;
        }
        let levels = self.levels();
        let mut weight = 1.0;
        for unit in &levels {
            weight /= 2.0;
            let ratio = offset / unit;
            if approx_eq(ratio, ratio.round()) {
                return weight;
            }
        }
        weight / 2.0
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Overwrite each event's metrical weight from its position in the bar that
/// starts at `bar_start`.
pub fn assign_metrical_weights(
    events: &mut [Event],
    time_signature: &TimeSignature,
    bar_start: f64,
) {
    for event in events {
        event.metrical_weight = time_signature.beat_strength(event.offset - bar_start);
    }
}
