// Chord weighting: how much a sonority counts toward being kept.
//
// The reducer sums a weight per event into a per-signature total and keeps
// the heaviest signatures. Four policies are available, each built on the
// one before it:
//
// - `DurationOnly`: the event's duration.
// - `DurationMetrical`: duration × metrical weight.
// - `MeasurePosition`: like `DurationMetrical`, except the last event of the
//   measure counts with metrical weight 1. Metrical models tend to
//   underrate whatever closes a bar.
// - `ConsonanceBoosted`: `MeasurePosition` scaled by 1.0 for consonant
//   sonorities and 0.1 for dissonant ones, so passing dissonances rarely win.
//
// The scanning position is passed in explicitly as a `WeighContext`;
// weighers hold no mutable state and can be shared freely.

use crate::consonance::{Consonance, TertianConsonance};
use crate::event::Event;
use serde::{Deserialize, Serialize};

/// Multiplier applied to dissonant sonorities by `ConsonanceBoosted`.
pub const DISSONANCE_FACTOR: f64 = 0.1;

/// Where the event being weighed sits among the measure's pitched events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeighContext {
    /// Zero-based index of the event.
    pub position: usize,
    /// Number of pitched events in the measure.
    pub total: usize,
}

impl WeighContext {
    pub fn is_final(&self) -> bool {
        self.position + 1 == self.total
    }
}

pub trait ChordWeigher {
    /// Non-negative weight of `event` at `context`.
    fn weigh(&self, event: &Event, context: WeighContext) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DurationOnly;

impl ChordWeigher for DurationOnly {
    fn weigh(&self, event: &Event, _context: WeighContext) -> f64 {
        event.duration.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DurationMetrical;

impl ChordWeigher for DurationMetrical {
    fn weigh(&self, event: &Event, _context: WeighContext) -> f64 {
        (event.duration * event.metrical_weight).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurePosition;

impl ChordWeigher for MeasurePosition {
    fn weigh(&self, event: &Event, context: WeighContext) -> f64 {
        if context.is_final() {
            DurationOnly.weigh(event, context)
        } else {
            DurationMetrical.weigh(event, context)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsonanceBoosted<C = TertianConsonance> {
    pub consonance: C,
}

impl<C: Consonance> ChordWeigher for ConsonanceBoosted<C> {
    fn weigh(&self, event: &Event, context: WeighContext) -> f64 {
        let factor = if self.consonance.is_consonant(&event.signature()) {
            1.0
        } else {
            DISSONANCE_FACTOR
        };
        MeasurePosition.weigh(event, context) * factor
    }
}

/// Config-level choice of weigher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightAlgorithm {
    DurationOnly,
    DurationMetrical,
    MeasurePosition,
    #[default]
    ConsonanceBoosted,
}

impl WeightAlgorithm {
    pub fn weigher(self) -> Box<dyn ChordWeigher + Send + Sync> {
        match self {
            WeightAlgorithm::DurationOnly => Box::new(DurationOnly),
            WeightAlgorithm::DurationMetrical => Box::new(DurationMetrical),
            WeightAlgorithm::MeasurePosition => Box::new(MeasurePosition),
            WeightAlgorithm::ConsonanceBoosted => Box::new(ConsonanceBoosted {
                consonance: TertianConsonance,
            }),
        }
    }
}
