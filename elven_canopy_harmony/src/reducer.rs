// Chord reduction: boil one measure down to a few representative chords.
//
// Input is a single gapless track of chords covering one measure, normally
// the output of `verticality::chordify`. Reduction runs in four steps:
//
// 1. Weigh. Every pitched event is weighed by the configured `ChordWeigher`
//    and the weights are summed per pitch-class signature. Rests are not
//    weighed and can never be selected.
// 2. Select. Signatures are ranked by total weight (ties keep the order in
//    which the signatures first appeared) and the top `num_chords` are taken.
//    Of those, any lighter than `trim_below` × the heaviest is dropped.
// 3. Collapse. A new output track is built in one pass. An event whose
//    signature was kept and differs from the current segment's starts a new
//    segment; anything else (unkept chords, rests, repeats of the current
//    signature) lengthens the current segment. Events before the first kept
//    chord are folded into it, so the first segment starts where the measure
//    starts. The output covers exactly the input's span.
// 4. Smooth. A segment starting a quarter, eighth, third, or sixteenth of a
//    beat past the beat is pulled back onto the beat, taking that sliver
//    from its predecessor. One pass, left to right.
//
// A measure containing only rests comes back as one rest of the same total
// length. An empty measure comes back empty.
//
// The reducer owns no per-call state, so one instance can reduce any number
// of measures, from any number of threads.

use crate::error::{HarmonyError, Result};
use crate::event::{EPSILON, Event, Signature, check_track};
use crate::weighting::{ChordWeigher, WeighContext, WeightAlgorithm};
use rustc_hash::FxHashMap;
use std::fmt;

pub const DEFAULT_NUM_CHORDS: usize = 3;
pub const DEFAULT_TRIM_BELOW: f64 = 0.25;

/// Syncopated segment starts, in thousandths of a beat past the beat: 1/4,
/// 1/8, 1/3, and 1/16 (which rounds either way, to 62 or 63).
pub const SYNCOPATION_THOUSANDTHS: [i64; 5] = [250, 125, 333, 63, 62];

pub struct ChordReducer {
    num_chords: usize,
    trim_below: f64,
    smooth_syncopation: bool,
    weigher: Box<dyn ChordWeigher + Send + Sync>,
}

impl fmt::Debug for ChordReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChordReducer")
            .field("num_chords", &self.num_chords)
            .field("trim_below", &self.trim_below)
            .field("smooth_syncopation", &self.smooth_syncopation)
            .finish_non_exhaustive()
    }
}

impl Default for ChordReducer {
    fn default() -> Self {
        ChordReducer {
            num_chords: DEFAULT_NUM_CHORDS,
            trim_below: DEFAULT_TRIM_BELOW,
            smooth_syncopation: true,
            weigher: WeightAlgorithm::default().weigher(),
        }
    }
}

/// Reject a chord count of zero and trim thresholds outside `0..=1`.
pub fn check_limits(num_chords: usize, trim_below: f64) -> Result<()> {
    if num_chords == 0 {
        return Err(HarmonyError::ZeroChords);
    }
    if !(0.0..=1.0).contains(&trim_below) {
        return Err(HarmonyError::TrimBelowOutOfRange(trim_below));
    }
    Ok(())
}

impl ChordReducer {
    pub fn new(num_chords: usize, trim_below: f64, algorithm: WeightAlgorithm) -> Result<Self> {
        Self::with_weigher(num_chords, trim_below, algorithm.weigher())
    }

    /// Build a reducer around a custom weigher.
    pub fn with_weigher(
        num_chords: usize,
        trim_below: f64,
        weigher: Box<dyn ChordWeigher + Send + Sync>,
    ) -> Result<Self> {
        check_limits(num_chords, trim_below)?;
        Ok(ChordReducer {
            num_chords,
            trim_below,
            smooth_syncopation: true,
            weigher,
        })
    }

    pub fn with_syncopation_smoothing(mut self, enabled: bool) -> Self {
        self.smooth_syncopation = enabled;
        self
    }

    pub fn num_chords(&self) -> usize {
        self.num_chords
    }

    pub fn trim_below(&self) -> f64 {
        self.trim_below
    }

    /// Total weight per signature, in order of first appearance.
    pub fn chord_weights(&self, events: &[Event]) -> Vec<(Signature, f64)> {
        let pitched: Vec<&Event> = events.iter().filter(|e| !e.is_rest()).collect();
        let total = pitched.len();

        let mut slots: FxHashMap<Signature, usize> = FxHashMap::default();
        let mut weights: Vec<(Signature, f64)> = Vec::new();
        for (position, event) in pitched.into_iter().enumerate() {
            let weight = self.weigher.weigh(event, WeighContext { position, total });
            let signature = event.signature();
            match slots.get(&signature) {
                Some(&slot) => weights[slot].1 += weight,
                None => {
                    slots.insert(signature.clone(), weights.len());
                    weights.push((signature, weight));
                }
            }
        }
        weights
    }

    /// The signatures that survive selection and trimming, heaviest first.
    pub fn select(&self, weights: &[(Signature, f64)]) -> Vec<Signature> {
        let mut ranked: Vec<&(Signature, f64)> = weights.iter().collect();
        // Stable: equal weights keep discovery order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(self.num_chords);

        let Some(heaviest) = ranked.first().map(|(_, weight)| *weight) else {
            return Vec::new();
        };
        let threshold = heaviest * self.trim_below;
        ranked
            .into_iter()
            .take_while(|(_, weight)| *weight >= threshold)
            .map(|(signature, _)| signature.clone())
            .collect()
    }

    /// Reduce one measure. See the module comment for the steps.
    pub fn reduce(&self, events: &[Event]) -> Result<Vec<Event>> {
        check_track(0, events)?;
        let Some(first) = events.first() else {
            return Ok(Vec::new());
        };

        let weights = self.chord_weights(events);
        let kept = self.select(&weights);
        log::debug!(
            "measure at {}: {} signatures, kept {}",
            first.offset,
            weights.len(),
            kept.iter()
                .map(Signature::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        );

        if kept.is_empty() {
            let total: f64 = events.iter().map(|e| e.duration).sum();
            log::debug!("measure at {} has no pitched events; using a rest", first.offset);
            return Ok(vec![Event::rest(first.offset, total)]);
        }

        let mut segments = collapse(events, &kept);
        if self.smooth_syncopation {
            smooth_syncopation(&mut segments, first.offset);
        }
        Ok(segments)
    }
}

/// Greedy pass building the output segments. `kept` must contain at least
/// one signature present in `events`.
fn collapse(events: &[Event], kept: &[Signature]) -> Vec<Event> {
    let measure_start = events.first().map_or(0.0, |e| e.offset);
    let mut segments: Vec<Event> = Vec::new();
    let mut current: Option<Signature> = None;
    let mut leading = 0.0;

    for event in events {
        let signature = event.signature();
        let opens_segment = kept.contains(&signature) && current.as_ref() != Some(&signature);
        if opens_segment {
            let mut segment = event.clone();
            // The segment now stands for several source chords.
            segment.tie = None;
            segment.accidental_display = None;
            match segments.last() {
                Some(previous) => segment.offset = previous.end(),
                None => {
                    segment.offset = measure_start;
                    segment.duration += leading;
                }
            }
            segments.push(segment);
            current = Some(signature);
        } else if let Some(segment) = segments.last_mut() {
            segment.duration += event.duration;
        } else {
            leading += event.duration;
        }
    }
    segments
}

/// Match `fraction` to three decimals against the syncopation list.
fn is_syncopated(fraction: f64) -> bool {
    let thousandths = (fraction * 1000.0).round() as i64;
    SYNCOPATION_THOUSANDTHS.contains(&thousandths)
}

/// Move syncopated segment starts back onto the beat.
fn smooth_syncopation(segments: &mut [Event], measure_start: f64) {
    for i in 1..segments.len() {
        let relative = segments[i].offset - measure_start;
        let fraction = relative - relative.floor();
        if !is_syncopated(fraction) {
            continue;
        }
        if segments[i - 1].duration <= fraction + EPSILON {
            // Would leave the previous segment with nothing.
            log::trace!("segment at {} too short to smooth", segments[i - 1].offset);
            continue;
        }
        segments[i - 1].duration -= fraction;
        segments[i].offset -= fraction;
        segments[i].duration += fraction;
    }
}
